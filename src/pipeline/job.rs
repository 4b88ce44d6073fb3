//! Per-invocation job state: scratch directory and artifact naming.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use tempfile::TempDir;
use tokio::fs;

use crate::{GgifError, config::AppConfig};

/// Extension of generated artifacts.
pub const ARTIFACT_EXTENSION: &str = "gif";

/// printf-style pattern ffmpeg expands into numbered frames.
pub const FRAME_PATTERN: &str = "frame%04d.png";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `<unix-seconds>-<seq>`, unique within this process.
pub fn unique_stamp() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{seconds}-{seq}")
}

/// File name for a freshly encoded gif.
pub fn artifact_name() -> String {
    format!("{}.{ARTIFACT_EXTENSION}", unique_stamp())
}

/// Object key for a file uploaded as is: `<stem>_<stamp><.ext>`.
pub fn upload_key(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    format!("{stem}_{}{extension}", unique_stamp())
}

/// A single conversion. The scratch directory is removed when the job drops.
#[derive(Debug)]
pub struct ConversionJob {
    source: PathBuf,
    scratch: TempDir,
    output_path: PathBuf,
    output_name: String,
}

impl ConversionJob {
    /// Creates the scratch directory and picks the artifact name.
    pub fn create(source: &Path, config: &AppConfig) -> Result<Self, GgifError> {
        let scratch = tempfile::Builder::new()
            .prefix("ggif-frames-")
            .tempdir_in(&config.scratch_root)
            .map_err(|err| {
                GgifError::Scratch(format!("{}: {err}", config.scratch_root.display()))
            })?;
        let output_name = artifact_name();
        Ok(Self {
            source: source.to_path_buf(),
            output_path: config.output_dir().join(&output_name),
            output_name,
            scratch,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Where ffmpeg writes numbered frames.
    pub fn frame_pattern(&self) -> PathBuf {
        self.scratch.path().join(FRAME_PATTERN)
    }

    /// Extracted frames in playback order.
    pub async fn frames(&self) -> Result<Vec<PathBuf>, GgifError> {
        let mut entries = fs::read_dir(self.scratch.path())
            .await
            .map_err(|err| GgifError::Io(format!("cannot list scratch directory: {err}")))?;
        let mut frames = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| GgifError::Io(format!("cannot list scratch directory: {err}")))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}
