//! Core library for ggif.
//!
//! ggif turns screen recordings into animated gifs. It watches (or scans) a
//! source folder for video files, hands each one to `ffmpeg` and `gifski`, and
//! optionally copies the result to Google Cloud Storage and/or S3 before
//! placing the public URL on the clipboard.
//!
//! The crate exposes the resolved configuration, the newest-file scan, the
//! conversion pipeline and the directory watcher that drives it.

pub mod config;
pub mod discovery;
pub mod pipeline;
pub mod process;
pub mod telemetry;
pub mod upload;
pub mod watch;

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    config::AppConfig,
    pipeline::ConversionPipeline,
    process::SystemRunner,
    telemetry::TelemetrySink,
    upload::{Uploader, clipboard::SystemClipboard},
};

/// Errors surfaced by configuration, discovery, the pipeline and the watcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GgifError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("watch failure: {0}")]
    Watch(String),
    #[error("no input: {0}")]
    NoInput(String),
    #[error("scratch directory failure: {0}")]
    Scratch(String),
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("{program} exited with {}", exit_label(.code))]
    Command { program: String, code: Option<i32> },
    #[error("{program} timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },
    #[error("clipboard failure: {0}")]
    Clipboard(String),
    #[error("task join failure: {0}")]
    Join(String),
    #[error("cancelled")]
    Cancelled,
}

impl GgifError {
    /// Fatal errors end the run; everything else is logged and skipped over.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GgifError::Config(_)
                | GgifError::Watch(_)
                | GgifError::NoInput(_)
                | GgifError::Scratch(_)
                | GgifError::Join(_)
        )
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl From<tokio::task::JoinError> for GgifError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = GgifError> = std::result::Result<T, E>;

/// Runs ggif with production collaborators: either the watch loop or a
/// single conversion of the explicit input or the newest video in `src`.
#[instrument(skip_all, fields(src = %config.src.display(), watch = config.watch))]
pub async fn run(
    config: AppConfig,
    telemetry: TelemetrySink,
    cancel: CancellationToken,
) -> Result<()> {
    let config = Arc::new(config);
    let runner = Arc::new(SystemRunner::new(config.command_timeout));
    let uploader = Uploader::new(
        runner.clone(),
        config.tools.clone(),
        Box::new(SystemClipboard),
    );
    let pipeline = ConversionPipeline::new(config.clone(), runner, uploader, telemetry);

    if config.watch {
        return watch::watch(&config.src, &pipeline, cancel).await;
    }

    let source = match &config.input {
        Some(path) => path.clone(),
        None => discovery::find_newest_video(config.src.clone())
            .await?
            .ok_or_else(|| {
                GgifError::NoInput(format!(
                    "no file specified and no video found in {}",
                    config.src.display()
                ))
            })?,
    };
    info!(source = %source.display(), "processing video");
    pipeline.process(&source, &cancel).await.map(|_| ())
}
