//! Directory watcher dispatching newly created files to the pipeline.

use std::path::Path;

use async_trait::async_trait;
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::CreateKind,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    GgifError,
    config::PipelineMode,
    pipeline::{ConversionPipeline, job::ARTIFACT_EXTENSION},
};

/// Receiving end of the filesystem event subscription.
pub type EventReceiver = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Work triggered for every newly created file.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, path: &Path, cancel: &CancellationToken) -> Result<(), GgifError>;

    /// Paths the handler produced itself and must not be fed back.
    fn skips(&self, _path: &Path) -> bool {
        false
    }
}

#[async_trait]
impl Dispatch for ConversionPipeline {
    async fn dispatch(&self, path: &Path, cancel: &CancellationToken) -> Result<(), GgifError> {
        self.process(path, cancel).await.map(|_| ())
    }

    /// Gifs this pipeline converts into the watched folder. Upload-only runs
    /// write nothing, so every created file is an input there.
    fn skips(&self, path: &Path) -> bool {
        let config = self.config();
        config.mode == PipelineMode::Convert
            && is_artifact(path)
            && path.parent().is_some_and(|dir| dir == config.output_dir())
    }
}

/// Whether `event` announces a new file.
pub fn is_creation(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(kind) if kind != CreateKind::Folder)
}

fn is_artifact(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
}

/// Starts a non-recursive subscription on `dir`. The watcher must be kept
/// alive for as long as events are wanted.
pub fn subscribe(dir: &Path) -> Result<(RecommendedWatcher, EventReceiver), GgifError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if tx.send(res).is_err() {
            debug!("event receiver dropped");
        }
    })
    .map_err(|err| GgifError::Watch(format!("cannot create watcher: {err}")))?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|err| GgifError::Watch(format!("cannot watch {}: {err}", dir.display())))?;
    Ok((watcher, rx))
}

/// Watches `dir` and dispatches every created file until `cancel` fires.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn watch(
    dir: &Path,
    handler: &dyn Dispatch,
    cancel: CancellationToken,
) -> Result<(), GgifError> {
    let (_watcher, events) = subscribe(dir)?;
    info!("watching for new files");
    consume(events, handler, cancel).await
}

/// Event loop. Each dispatch completes before the next event is read.
pub async fn consume(
    mut events: EventReceiver,
    handler: &dyn Dispatch,
    cancel: CancellationToken,
) -> Result<(), GgifError> {
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("watcher cancelled");
                return Ok(());
            }
            received = events.recv() => received,
        };

        let event = match received {
            Some(Ok(event)) => event,
            Some(Err(err)) => {
                warn!(error = %err, "watch error");
                continue;
            }
            None => {
                info!("event stream closed");
                return Ok(());
            }
        };

        debug!(kind = ?event.kind, paths = ?event.paths, "event");
        if !is_creation(&event) {
            continue;
        }

        for path in &event.paths {
            if handler.skips(path) {
                debug!(path = %path.display(), "ignoring generated artifact");
                continue;
            }
            info!(path = %path.display(), "new file");
            match handler.dispatch(path, &cancel).await {
                Ok(()) => {}
                Err(GgifError::Cancelled) => {
                    info!("watcher cancelled during job");
                    return Ok(());
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => error!(path = %path.display(), error = %err, "job failed"),
            }
        }
    }
}
