//! Conversion pipeline: extract frames, encode a gif, upload it.
//!
//! Stages run strictly one after another. A failing external tool is logged
//! and the pipeline moves on to the next stage; only scratch-directory
//! creation, an empty input path, and cancellation stop a job early.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::{
    GgifError,
    config::{AppConfig, PipelineMode},
    process::CommandRunner,
    telemetry::{Stage, TelemetrySink},
    upload::{Store, UploadResult, Uploader},
};

pub mod encode;
pub mod extract;
pub mod job;

use self::job::ConversionJob;

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub object_key: String,
    pub uploads: Vec<UploadResult>,
}

/// Runs conversion jobs against the shared configuration.
pub struct ConversionPipeline {
    config: Arc<AppConfig>,
    runner: Arc<dyn CommandRunner>,
    uploader: Uploader,
    telemetry: TelemetrySink,
}

impl ConversionPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        runner: Arc<dyn CommandRunner>,
        uploader: Uploader,
        telemetry: TelemetrySink,
    ) -> Self {
        Self {
            config,
            runner,
            uploader,
            telemetry,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn telemetry(&self) -> TelemetrySink {
        self.telemetry.clone()
    }

    /// Processes one source video end to end.
    #[instrument(skip_all, fields(source = %source.display(), mode = ?self.config.mode))]
    pub async fn process(
        &self,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<ConversionOutcome, GgifError> {
        if source.as_os_str().is_empty() {
            return Err(GgifError::NoInput(
                "no file specified and no file found in the source folder".to_string(),
            ));
        }

        let (artifact, object_key) = match self.config.mode {
            PipelineMode::Convert => self.convert(source, cancel).await?,
            PipelineMode::UploadOnly => (source.to_path_buf(), job::upload_key(source)),
        };

        let uploads = self.dispatch_uploads(&artifact, &object_key, cancel).await?;
        self.telemetry.record_completed();
        info!(artifact = %artifact.display(), uploads = uploads.len(), "job finished");

        Ok(ConversionOutcome {
            source: source.to_path_buf(),
            artifact,
            object_key,
            uploads,
        })
    }

    /// Extract and encode; the scratch directory is gone once this returns.
    async fn convert(
        &self,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, String), GgifError> {
        let job = ConversionJob::create(source, &self.config)?;
        debug!(scratch = %job.scratch_dir().display(), "created scratch directory");

        let extracted =
            extract::extract_frames(self.runner.as_ref(), &self.config, &job, cancel).await;
        self.observe(Stage::Extract, extracted)?;

        let encoded =
            encode::encode_frames(self.runner.as_ref(), &self.config, &job, cancel).await;
        self.observe(Stage::Encode, encoded)?;

        Ok((job.output_path().to_path_buf(), job.output_name().to_string()))
    }

    async fn dispatch_uploads(
        &self,
        artifact: &Path,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<UploadResult>, GgifError> {
        let mut uploads = Vec::new();
        for store in Store::ALL {
            let Some(bucket) = self.config.buckets.bucket(store) else {
                continue;
            };
            let result = self
                .uploader
                .upload(store, bucket, artifact, key, cancel)
                .await;
            if let Some(upload) = self.observe(Stage::Upload, result)?.flatten() {
                uploads.push(upload);
            }
        }
        Ok(uploads)
    }

    /// Records a stage outcome. Cancellation propagates; other errors are
    /// logged and swallowed so the next stage still runs.
    fn observe<T>(
        &self,
        stage: Stage,
        result: Result<T, GgifError>,
    ) -> Result<Option<T>, GgifError> {
        self.telemetry.record_stage(stage);
        match result {
            Ok(value) => Ok(Some(value)),
            Err(GgifError::Cancelled) => Err(GgifError::Cancelled),
            Err(err) => {
                self.telemetry.record_failure(stage);
                error!(stage = %stage, error = %err, "stage failed");
                Ok(None)
            }
        }
    }
}
