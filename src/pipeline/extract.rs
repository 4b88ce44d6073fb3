//! Frame extraction stage running ffmpeg against the source video.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    GgifError,
    config::{AppConfig, ToolPaths},
    process::{CommandRunner, Invocation, execute},
};

use super::job::ConversionJob;

/// `ffmpeg -y -i <source> -vf fps=<rate> <pattern>`.
pub fn extract_invocation(
    tools: &ToolPaths,
    source: &Path,
    frame_pattern: &Path,
    frame_rate: u32,
) -> Invocation {
    Invocation::new(&tools.ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(source)
        .arg("-vf")
        .arg(format!("fps={frame_rate}"))
        .arg(frame_pattern)
}

/// Writes numbered PNG frames of the job's source into its scratch directory.
#[instrument(skip_all, fields(source = %job.source().display()))]
pub async fn extract_frames(
    runner: &dyn CommandRunner,
    config: &AppConfig,
    job: &ConversionJob,
    cancel: &CancellationToken,
) -> Result<(), GgifError> {
    let invocation = extract_invocation(
        &config.tools,
        job.source(),
        &job.frame_pattern(),
        config.encoder.frame_rate,
    );
    execute(runner, &invocation, cancel).await.map(|_| ())
}
