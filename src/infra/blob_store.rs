// ============================================================
// Layer 6 - Local Blob Store
// ============================================================
// A `BlobStore` backed by a directory on disk. Each bucket is a
// sub-directory of the root and each object a file inside it:
//
//   {root}/
//     diabetes-data/
//       diabetes_raw.csv
//       best_model.json
//       model_metrics.json
//
// Used for offline runs (`--blob-endpoint file:///data/blobs`)
// and by the tests. Writes go to a temporary file first and are
// renamed into place, so a reader never sees half an object.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::config::BlobConfig;
use crate::domain::error::PipelineError;
use crate::domain::traits::BlobStore;
use crate::infra::s3::{S3BlobStore, S3Settings};

/// Build the blob store named by `cfg.endpoint`:
/// `file://dir` or an existing directory → LocalBlobStore,
/// anything else → S3BlobStore
pub fn open_blob_store(cfg: &BlobConfig) -> Result<Box<dyn BlobStore>> {
    if let Some(dir) = cfg.endpoint.strip_prefix("file://") {
        return Ok(Box::new(LocalBlobStore::new(dir)));
    }
    if Path::new(&cfg.endpoint).is_dir() {
        return Ok(Box::new(LocalBlobStore::new(&cfg.endpoint)));
    }

    let store = S3BlobStore::new(S3Settings {
        endpoint:   cfg.endpoint.clone(),
        access_key: cfg.access_key.clone(),
        secret_key: cfg.secret_key.clone(),
        region:     cfg.region.clone(),
    })?;
    Ok(Box::new(store))
}

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        // Keys are flat names; refuse anything that could escape the bucket
        if key.is_empty() || key.contains("..") || Path::new(key).is_absolute() {
            return Err(PipelineError::Schema(format!("invalid object key '{key}'")).into());
        }
        Ok(self.root.join(bucket).join(key))
    }
}

impl BlobStore for LocalBlobStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(PipelineError::retrieval(bucket, key, "object does not exist").into());
        }
        fs::read(&path).map_err(|e| PipelineError::retrieval(bucket, key, e).into())
    }

    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        let dir  = self.root.join(bucket);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create bucket directory '{}'", dir.display()))?;

        let tmp = path.with_extension("partial");
        fs::write(&tmp, bytes).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Cannot move object into '{}'", path.display()))?;

        tracing::debug!("Stored {} bytes at '{}'", bytes.len(), path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let dir   = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.put("bucket", "a.csv", b"x,y\n1,2\n").unwrap();
        assert_eq!(store.get("bucket", "a.csv").unwrap(), b"x,y\n1,2\n");
    }

    #[test]
    fn test_missing_object_is_a_retrieval_error() {
        let dir   = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err   = store.get("bucket", "missing.csv").unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Retrieval { .. })));
    }

    #[test]
    fn test_file_endpoint_opens_a_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BlobConfig {
            endpoint: format!("file://{}", dir.path().display()),
            ..Default::default()
        };
        let store = open_blob_store(&cfg).unwrap();
        assert_eq!(store.describe(), cfg.endpoint);
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir   = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(store.put("bucket", "../outside", b"x").is_err());
    }
}
