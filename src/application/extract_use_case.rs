// ============================================================
// Layer 2 - ExtractUseCase (Stage 1)
// ============================================================
// Copies the raw dataset object from the blob store into the
// local working file. No transformation happens here.
//
//   Step 1: Fetch bucket/raw_object   (Layer 6 - infra)
//   Step 2: Write it to the raw path  (local disk)
//
// Re-running overwrites the local copy with the same bytes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::config::BlobConfig;
use crate::domain::traits::BlobStore;

pub struct ExtractUseCase<'a> {
    store:  &'a dyn BlobStore,
    config: BlobConfig,
}

impl<'a> ExtractUseCase<'a> {
    pub fn new(store: &'a dyn BlobStore, config: &BlobConfig) -> Self {
        Self { store, config: config.clone() }
    }

    /// Fetch the raw object into `local_path` and return that path
    pub fn execute(&self, local_path: &Path) -> Result<PathBuf> {
        let cfg = &self.config;

        // ── Step 1: Fetch the object ─────────────────────────────────────────
        tracing::info!(
            "Downloading '{}/{}' from {}",
            cfg.bucket,
            cfg.raw_object,
            self.store.describe()
        );
        let bytes = self.store.get(&cfg.bucket, &cfg.raw_object)?;

        // ── Step 2: Write the local copy ─────────────────────────────────────
        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        fs::write(local_path, &bytes)
            .with_context(|| format!("Cannot write '{}'", local_path.display()))?;

        let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
        tracing::info!("Extracted {:.2} MB to '{}'", size_mb, local_path.display());

        Ok(local_path.to_path_buf())
    }
}
