//! Upload of finished artifacts through vendor CLIs.

pub mod clipboard;

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    GgifError,
    config::ToolPaths,
    process::{CommandRunner, Invocation, execute},
};

use self::clipboard::Clipboard;

/// Supported object stores, in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    Gcs,
    S3,
}

impl Store {
    pub const ALL: [Store; 2] = [Store::Gcs, Store::S3];

    /// Publicly reachable URL of `key` in `bucket`.
    pub fn public_url(self, bucket: &str, key: &str) -> String {
        match self {
            Store::Gcs => format!("https://storage.googleapis.com/{bucket}/{key}"),
            Store::S3 => format!("https://{bucket}.s3.amazonaws.com/{key}"),
        }
    }

    /// Vendor CLI call copying `artifact` to `bucket` under `key`.
    pub fn copy_invocation(
        self,
        tools: &ToolPaths,
        bucket: &str,
        artifact: &Path,
        key: &str,
    ) -> Invocation {
        match self {
            Store::Gcs => Invocation::new(&tools.gsutil)
                .arg("cp")
                .arg(artifact)
                .arg(format!("gs://{bucket}/{key}")),
            Store::S3 => Invocation::new(&tools.aws)
                .arg("s3")
                .arg("cp")
                .arg(artifact)
                .arg(format!("s3://{bucket}/{key}"))
                .arg("--acl")
                .arg("public-read"),
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Store::Gcs => "gcs",
            Store::S3 => "s3",
        })
    }
}

/// Outcome of one successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub store: Store,
    pub artifact: PathBuf,
    pub object_key: String,
    pub public_url: String,
    pub copied_to_clipboard: bool,
}

/// Copies artifacts to object stores and publishes their URLs.
pub struct Uploader {
    runner: Arc<dyn CommandRunner>,
    tools: ToolPaths,
    clipboard: Mutex<Box<dyn Clipboard>>,
}

impl Uploader {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        tools: ToolPaths,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        Self {
            runner,
            tools,
            clipboard: Mutex::new(clipboard),
        }
    }

    /// Uploads `artifact` as `key`. Does nothing when `bucket` is empty.
    ///
    /// On success the public URL is printed to stdout and written to the
    /// clipboard. Clipboard failures are logged, never returned.
    #[instrument(skip_all, fields(store = %store, bucket = %bucket, key = %key))]
    pub async fn upload(
        &self,
        store: Store,
        bucket: &str,
        artifact: &Path,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<UploadResult>, GgifError> {
        if bucket.is_empty() {
            return Ok(None);
        }

        let invocation = store.copy_invocation(&self.tools, bucket, artifact, key);
        execute(self.runner.as_ref(), &invocation, cancel).await?;

        let public_url = store.public_url(bucket, key);
        info!(url = %public_url, "upload complete");
        println!("{public_url}");
        let copied_to_clipboard = match self.copy_to_clipboard(&public_url) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "could not copy URL to clipboard");
                false
            }
        };

        Ok(Some(UploadResult {
            store,
            artifact: artifact.to_path_buf(),
            object_key: key.to_string(),
            public_url,
            copied_to_clipboard,
        }))
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<(), GgifError> {
        let mut clipboard = self
            .clipboard
            .lock()
            .map_err(|_| GgifError::Clipboard("clipboard mutex poisoned".to_string()))?;
        clipboard.set_text(text)
    }
}
