//! Encode stage turning extracted frames into a gif with gifski.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::{
    GgifError,
    config::{AppConfig, EncoderSettings, ToolPaths},
    process::{CommandRunner, Invocation, execute},
};

use super::job::ConversionJob;

/// `gifski -W <width> -r <fps> -Q <quality> -o <output> <frames...>`.
pub fn encode_invocation(
    tools: &ToolPaths,
    settings: EncoderSettings,
    frames: &[PathBuf],
    output: &Path,
) -> Invocation {
    Invocation::new(&tools.gifski)
        .arg("-W")
        .arg(settings.width.to_string())
        .arg("-r")
        .arg(settings.frame_rate.to_string())
        .arg("-Q")
        .arg(settings.quality.to_string())
        .arg("-o")
        .arg(output)
        .args(frames)
}

/// Encodes whatever frames the scratch directory holds into the job's output.
#[instrument(skip_all, fields(output = %job.output_path().display()))]
pub async fn encode_frames(
    runner: &dyn CommandRunner,
    config: &AppConfig,
    job: &ConversionJob,
    cancel: &CancellationToken,
) -> Result<(), GgifError> {
    let frames = job.frames().await?;
    if frames.is_empty() {
        warn!("no frames extracted; encoding anyway");
    }
    if let Some(parent) = job.output_path().parent() {
        if let Err(err) = fs::create_dir_all(parent).await {
            warn!(dir = %parent.display(), error = %err, "cannot create output directory");
        }
    }
    let invocation = encode_invocation(&config.tools, config.encoder, &frames, job.output_path());
    execute(runner, &invocation, cancel).await.map(|_| ())
}
