//! Upload of the staged tree and manifest
//!
//! Artifacts go to [`ARTIFACT_BUCKET`] under `<projectName>/<buildNumber>/`;
//! the manifest goes to [`BUILDS_BUCKET`] once every artifact is stored.

mod memory;
mod s3;

pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::StorageError;
use crate::fs::{to_key_path, walk_files};
use crate::manifest::Manifest;

pub const ARTIFACT_BUCKET: &str = "riffraff-artifact";
pub const BUILDS_BUCKET: &str = "riffraff-builds";
pub const REGION: &str = "eu-west-1";

/// Write-only object storage
pub trait ObjectStore: Send + Sync + 'static {
    fn put(
        &self,
        data: Vec<u8>,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub key_prefix: String,
    pub artifacts: usize,
    pub manifest_key: String,
}

/// Upload every file under `root` to `bucket`, keyed `<prefix>/<relative path>`.
///
/// One task per file. Every task is awaited even after a failure; the
/// result reports the first failure and how many uploads failed.
pub async fn sync_dir<S: ObjectStore>(
    store: Arc<S>,
    root: &Path,
    bucket: &str,
    prefix: &str,
) -> Result<usize, StorageError> {
    let files = walk_files(root).map_err(|source| StorageError::Read {
        path: root.to_path_buf(),
        source,
    })?;
    let total = files.len();

    let mut tasks = JoinSet::new();
    for relative in files {
        let path = root.join(&relative);
        let data = std::fs::read(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        let key = format!("{}/{}", prefix, to_key_path(&relative));
        let bucket = bucket.to_string();

        tracing::info!("sync: {} -> {}", path.display(), key);
        let store = Arc::clone(&store);
        tasks.spawn(async move { store.put(data, &bucket, &key).await });
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.unwrap_or_else(|err| {
            Err(StorageError::Put {
                bucket: bucket.to_string(),
                key: prefix.to_string(),
                message: format!("upload task failed: {}", err),
            })
        });
        if let Err(err) = outcome {
            tracing::error!("{}", err);
            failures.push(err);
        }
    }

    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(total),
        Some(first) => Err(StorageError::Incomplete {
            failed,
            total,
            first: Box::new(first),
        }),
    }
}

/// Upload the staged tree, then the manifest.
///
/// The manifest is written only after every artifact upload succeeded.
pub async fn publish<S: ObjectStore>(
    store: Arc<S>,
    staging_root: &Path,
    manifest: &Manifest,
) -> Result<PublishReport, StorageError> {
    let key_prefix = manifest.key_prefix();
    tracing::info!("S3 prefix: {}", key_prefix);

    let artifacts = sync_dir(Arc::clone(&store), staging_root, ARTIFACT_BUCKET, &key_prefix).await?;

    let manifest_key = manifest.key();
    let body = manifest.to_json()?;
    store.put(body, BUILDS_BUCKET, &manifest_key).await?;

    tracing::info!("Upload complete.");
    Ok(PublishReport {
        key_prefix,
        artifacts,
        manifest_key,
    })
}
