//! Newest-video lookup in the source folder.

use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{debug, instrument, warn};

use crate::GgifError;

/// Bytes read from the head of a file for content sniffing.
const SNIFF_LEN: u64 = 8192;

/// Returns the most recently modified video directly inside `dir`.
///
/// Entries are classified by content, not extension. Entries that cannot be
/// read are logged and skipped. When two videos share a modification time,
/// the one listed last wins.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn find_newest(dir: &Path) -> Result<Option<PathBuf>, GgifError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| GgifError::Io(format!("cannot list {}: {err}", dir.display())))?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let modified = match inspect(&path) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping entry");
                continue;
            }
        };
        if newest
            .as_ref()
            .is_none_or(|(best, _)| modified >= *best)
        {
            newest = Some((modified, path));
        }
    }

    debug!(newest = ?newest.as_ref().map(|(_, path)| path), "scan finished");
    Ok(newest.map(|(_, path)| path))
}

/// Async wrapper running [`find_newest`] on the blocking pool.
pub async fn find_newest_video(dir: PathBuf) -> Result<Option<PathBuf>, GgifError> {
    tokio::task::spawn_blocking(move || find_newest(&dir)).await?
}

/// Whether the file at `path` starts with a known video signature.
pub fn is_video(path: &Path) -> io::Result<bool> {
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok(infer::is_video(&head))
}

/// Modification time of a regular video file; `None` for anything else.
fn inspect(path: &Path) -> io::Result<Option<SystemTime>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }
    if !is_video(path)? {
        debug!(path = %path.display(), "not a video");
        return Ok(None);
    }
    metadata.modified().map(Some)
}
