// ============================================================
// Layer 6 - Artifact Store
// ============================================================
// Saves and restores the files the stages hand to each other
// or leave behind for later use:
//
//   scaler.json          fitted StandardScaler (Cleaner)
//   best_model.json      winning model, tagged with its kind (Trainer)
//   model_metrics.json   per-candidate scores + winner (Trainer)
//
// Everything is pretty-printed JSON so a run can be inspected
// by hand. A fitted scaler or model can be reloaded with its
// concrete type, e.g. to transform new rows consistently.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::application::config::WorkPaths;
use crate::data::scaler::StandardScaler;
use crate::domain::evaluation::MetricsDocument;
use crate::ml::model::TrainedModel;

pub struct ArtifactStore {
    paths: WorkPaths,
}

impl ArtifactStore {
    pub fn new(paths: &WorkPaths) -> Self {
        Self { paths: paths.clone() }
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<()> {
        write_json(&self.paths.scaler, scaler)
    }

    pub fn save_model(&self, model: &TrainedModel) -> Result<()> {
        write_json(&self.paths.model, model)
    }

    pub fn save_metrics(&self, metrics: &MetricsDocument) -> Result<()> {
        write_json(&self.paths.metrics, metrics)
    }

    pub fn load_metrics(&self) -> Result<MetricsDocument> {
        read_json(&self.paths.metrics, "Run 'train' first")
    }

    pub fn model_path(&self) -> &Path {
        &self.paths.model
    }

    pub fn metrics_path(&self) -> &Path {
        &self.paths.metrics
    }
}

// Reload side for applying fitted artifacts to a later batch;
// no stage of a run reads its own artifacts back.
#[allow(dead_code)]
impl ArtifactStore {
    pub fn load_scaler(&self) -> Result<StandardScaler> {
        read_json(&self.paths.scaler, "Run 'clean' first")
    }

    pub fn load_model(&self) -> Result<TrainedModel> {
        read_json(&self.paths.model, "Run 'train' first")
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;

    tracing::debug!("Saved '{}'", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, hint: &str) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'. {hint}.", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("'{}' is not valid", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CandidateConfig;
    use std::collections::BTreeMap;

    #[test]
    fn test_model_survives_a_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(&WorkPaths::in_dir(dir.path()));
        let model = TrainedModel::candidates(&CandidateConfig::default()).remove(0);

        store.save_model(&model).unwrap();
        assert_eq!(store.load_model().unwrap(), model);
    }

    #[test]
    fn test_metrics_document_is_pretty_json() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(&WorkPaths::in_dir(dir.path().join("nested")));
        let doc   = MetricsDocument {
            best_model:         "Random Forest".to_string(),
            results:            BTreeMap::new(),
            feature_importance: None,
            features:           vec!["age".to_string()],
        };

        store.save_metrics(&doc).unwrap();
        let text = fs::read_to_string(store.metrics_path()).unwrap();
        assert!(text.contains("\n  \"best_model\": \"Random Forest\""));
        assert_eq!(store.load_metrics().unwrap().best_model, "Random Forest");
    }

    #[test]
    fn test_missing_artifact_explains_itself() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(&WorkPaths::in_dir(dir.path()));
        let err   = store.load_scaler().unwrap_err();
        assert!(format!("{err:#}").contains("Run 'clean' first"));
    }
}
