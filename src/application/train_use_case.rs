// ============================================================
// Layer 2 - TrainUseCase (Stage 4)
// ============================================================
// Fits the candidate models on the cleaned data and keeps the
// best one:
//
//   Step 1: Read cleaned CSV               (Layer 4 - data)
//   Step 2: Build the feature matrix       (Layer 4 - data)
//   Step 3: Stratified 80/20 split         (Layer 4 - data)
//   Step 4: Fit + score every candidate    (Layer 5 - ml)
//   Step 5: Select by weighted F1          (Layer 5 - ml)
//   Step 6: Save model + metrics           (Layer 6 - infra)
//   Step 7: Publish to the blob store      (Layer 6 - infra, optional)
//
// Step 7 never fails the stage: an upload error is logged and
// the local artifacts stay authoritative.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};

use crate::application::config::TrainSettings;
use crate::data::features::FeatureMatrix;
use crate::data::loader::read_csv;
use crate::data::splitter::stratified_split;
use crate::domain::error::PipelineError;
use crate::domain::evaluation::MetricsDocument;
use crate::domain::record::CleanedRecord;
use crate::domain::traits::{BlobStore, Classifier};
use crate::infra::artifacts::ArtifactStore;
use crate::ml::model::TrainedModel;
use crate::ml::trainer::{fit_candidates, select_best, SplitData};

/// Where to upload artifacts after a successful training run
pub struct Publisher<'a> {
    pub store:  &'a dyn BlobStore,
    pub bucket: String,
}

impl Publisher<'_> {
    fn upload(&self, path: &Path) -> std::result::Result<(), PipelineError> {
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let failed = |reason: String| PipelineError::Publish { key: key.clone(), reason };

        let bytes = fs::read(path).map_err(|e| failed(e.to_string()))?;
        self.store
            .put(&self.bucket, &key, &bytes)
            .map_err(|e| failed(format!("{e:#}")))?;

        tracing::info!("Published '{}' to {}/{}", path.display(), self.bucket, key);
        Ok(())
    }
}

pub struct TrainUseCase<'a> {
    settings:  TrainSettings,
    artifacts: ArtifactStore,
    publisher: Option<Publisher<'a>>,
}

impl<'a> TrainUseCase<'a> {
    pub fn new(settings: &TrainSettings, artifacts: ArtifactStore) -> Self {
        Self { settings: settings.clone(), artifacts, publisher: None }
    }

    /// Upload the artifacts to `bucket` when `settings.publish` is on
    pub fn with_publisher(mut self, store: &'a dyn BlobStore, bucket: &str) -> Self {
        self.publisher = Some(Publisher { store, bucket: bucket.to_string() });
        self
    }

    /// Train on `input` and return the metrics document that was saved
    pub fn execute(&self, input: &Path) -> Result<MetricsDocument> {
        let cfg = &self.settings;

        // ── Step 1: Read the cleaned CSV ─────────────────────────────────────
        let data = read_csv::<CleanedRecord>(input)?;
        tracing::info!("Loaded {} cleaned rows from '{}'", data.len(), input.display());

        // ── Step 2: Features and label ───────────────────────────────────────
        let features = FeatureMatrix::from_dataset(&data)?;
        let [negatives, positives] = features.label_counts();
        tracing::info!(
            "Training on {} features; label distribution: 0 → {}, 1 → {} ({} rows dropped)",
            features.names.len(),
            negatives,
            positives,
            features.dropped
        );

        // ── Step 3: Stratified split ─────────────────────────────────────────
        let labels = features.y.to_vec();
        let (train, test) = stratified_split(&labels, cfg.test_fraction, cfg.seed);
        if train.is_empty() || test.is_empty() {
            return Err(PipelineError::EmptyDataset(format!(
                "split of {} rows into {} train / {} test",
                labels.len(),
                train.len(),
                test.len()
            ))
            .into());
        }
        tracing::info!("Split: {} train, {} test (seed {})", train.len(), test.len(), cfg.seed);
        let split = SplitData::from_indices(&features, &train, &test);

        // ── Step 4: Fit and score ────────────────────────────────────────────
        let outcomes = fit_candidates(TrainedModel::candidates(&cfg.seeded_candidates()), &split)?;

        // ── Step 5: Select the winner ────────────────────────────────────────
        let best = select_best(outcomes.iter().map(|o| o.evaluation.f1_score))
            .ok_or_else(|| anyhow!("no candidate produced a usable F1 score"))?;
        let winner = &outcomes[best];
        tracing::info!("Best model: {} (weighted F1 {:.4})", winner.name, winner.evaluation.f1_score);

        let feature_importance = winner.model.feature_importances().map(|importances| {
            features
                .names
                .iter()
                .cloned()
                .zip(importances)
                .collect::<BTreeMap<_, _>>()
        });
        let metrics = MetricsDocument {
            best_model: winner.name.to_string(),
            results:    outcomes
                .iter()
                .map(|o| (o.name.to_string(), o.evaluation.clone()))
                .collect(),
            feature_importance,
            features: features.names.clone(),
        };

        // ── Step 6: Persist ──────────────────────────────────────────────────
        self.artifacts.save_model(&winner.model)?;
        self.artifacts.save_metrics(&metrics)?;
        tracing::info!(
            "Saved model to '{}' and metrics to '{}'",
            self.artifacts.model_path().display(),
            self.artifacts.metrics_path().display()
        );

        // ── Step 7: Publish (non-fatal) ──────────────────────────────────────
        match (&self.publisher, cfg.publish) {
            (Some(publisher), true) => {
                for path in [self.artifacts.model_path(), self.artifacts.metrics_path()] {
                    if let Err(e) = publisher.upload(path) {
                        tracing::warn!("{}; continuing with local artifacts only", e);
                    }
                }
            }
            (None, true) => tracing::debug!("No blob store configured; skipping publish"),
            (_, false) => tracing::info!("Publishing disabled"),
        }

        Ok(metrics)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::WorkPaths;
    use crate::infra::blob_store::LocalBlobStore;
    use crate::ml::model::CandidateConfig;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::fmt::Write as _;

    /// Cleaned-looking CSV where diabetes follows hbA1c and glucose
    fn cleaned_csv(n: usize, with_asian: bool) -> String {
        let mut rng = StdRng::seed_from_u64(3);
        let mut out = String::from("age,bmi,hbA1c_level,blood_glucose_level,hypertension,gender_encoded,smoking_encoded");
        if with_asian {
            out.push_str(",race:Asian");
        }
        out.push_str(",diabetes\n");

        for _ in 0..n {
            let hba1c: f64   = rng.gen_range(-2.0..2.0);
            let glucose: f64 = rng.gen_range(-2.0..2.0);
            let label        = u8::from(hba1c + glucose > 1.0);
            write!(
                out,
                "{:.3},{:.3},{:.3},{:.3},{},{},{}",
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                hba1c,
                glucose,
                rng.gen_range(0..2),
                rng.gen_range(0..2),
                rng.gen_range(0..4),
            )
            .unwrap();
            if with_asian {
                write!(out, ",{}", rng.gen_range(0..2)).unwrap();
            }
            writeln!(out, ",{label}").unwrap();
        }
        out
    }

    fn quick_settings(publish: bool) -> TrainSettings {
        TrainSettings {
            publish,
            candidates: CandidateConfig { forest_trees: 10, forest_max_depth: 5, ..Default::default() },
            ..Default::default()
        }
    }

    fn setup(csv: &str) -> (tempfile::TempDir, WorkPaths) {
        let dir   = tempfile::tempdir().unwrap();
        let paths = WorkPaths::in_dir(dir.path());
        fs::write(&paths.clean_csv, csv).unwrap();
        (dir, paths)
    }

    #[test]
    fn test_best_model_has_the_highest_f1() {
        let (_dir, paths) = setup(&cleaned_csv(300, true));
        let metrics = TrainUseCase::new(&quick_settings(false), ArtifactStore::new(&paths))
            .execute(&paths.clean_csv)
            .unwrap();

        assert_eq!(metrics.results.len(), 2);
        let best = metrics.results[&metrics.best_model].f1_score;
        assert!(metrics.results.values().all(|r| best >= r.f1_score));
        assert!(paths.model.exists());
        assert!(paths.metrics.exists());
    }

    #[test]
    fn test_runs_are_reproducible() {
        let (_dir, paths) = setup(&cleaned_csv(200, true));
        let settings = quick_settings(false);

        let first  = TrainUseCase::new(&settings, ArtifactStore::new(&paths)).execute(&paths.clean_csv).unwrap();
        let model1 = fs::read_to_string(&paths.model).unwrap();
        let second = TrainUseCase::new(&settings, ArtifactStore::new(&paths)).execute(&paths.clean_csv).unwrap();
        let model2 = fs::read_to_string(&paths.model).unwrap();

        assert_eq!(first, second);
        assert_eq!(model1, model2);
    }

    #[test]
    fn test_absent_feature_column_is_tolerated() {
        let (_dir, paths) = setup(&cleaned_csv(200, false));
        let metrics = TrainUseCase::new(&quick_settings(false), ArtifactStore::new(&paths))
            .execute(&paths.clean_csv)
            .unwrap();

        assert_eq!(metrics.features.len(), 7);
        assert!(!metrics.features.iter().any(|f| f == "race:Asian"));
        if let Some(importance) = &metrics.feature_importance {
            assert_eq!(importance.len(), 7);
            assert!(!importance.contains_key("race:Asian"));
        }
    }

    #[test]
    fn test_tied_candidates_keep_the_first_declared() {
        // one feature with a wide gap between the classes: every
        // candidate scores a perfect F1 on the held-out rows
        let mut csv = String::from("hbA1c_level,diabetes\n");
        for i in 0..200 {
            let offset = (i % 50) as f64 / 50.0;
            if i % 2 == 0 {
                writeln!(csv, "{:.3},1", 1.0 + offset).unwrap();
            } else {
                writeln!(csv, "{:.3},0", -1.0 - offset).unwrap();
            }
        }
        let (_dir, paths) = setup(&csv);
        let metrics = TrainUseCase::new(&quick_settings(false), ArtifactStore::new(&paths))
            .execute(&paths.clean_csv)
            .unwrap();

        assert!(metrics.results.values().all(|r| r.f1_score == 1.0));
        assert_eq!(metrics.best_model, "Logistic Regression");
        assert_eq!(metrics.feature_importance, None);
        assert_eq!(metrics.features, vec!["hbA1c_level".to_string()]);
    }

    #[test]
    fn test_missing_label_column_fails() {
        let (_dir, paths) = setup("age,bmi\n0.1,0.2\n0.3,0.4\n");
        let err = TrainUseCase::new(&quick_settings(false), ArtifactStore::new(&paths))
            .execute(&paths.clean_csv)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::MissingColumn(_))));
    }

    #[test]
    fn test_publishes_both_artifacts() {
        let (dir, paths) = setup(&cleaned_csv(200, true));
        let blobs = LocalBlobStore::new(dir.path().join("blobs"));

        TrainUseCase::new(&quick_settings(true), ArtifactStore::new(&paths))
            .with_publisher(&blobs, "diabetes-data")
            .execute(&paths.clean_csv)
            .unwrap();

        assert_eq!(blobs.get("diabetes-data", "best_model.json").unwrap(), fs::read(&paths.model).unwrap());
        assert!(blobs.get("diabetes-data", "model_metrics.json").is_ok());
    }

    /// Refuses every upload
    struct ReadOnlyStore;

    impl BlobStore for ReadOnlyStore {
        fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
            Err(PipelineError::retrieval(bucket, key, "read-only test store").into())
        }
        fn put(&self, _: &str, _: &str, _: &[u8]) -> Result<()> {
            Err(anyhow!("access denied"))
        }
        fn describe(&self) -> String {
            "read-only".into()
        }
    }

    #[test]
    fn test_publish_failure_does_not_fail_training() {
        let (_dir, paths) = setup(&cleaned_csv(200, true));
        let result = TrainUseCase::new(&quick_settings(true), ArtifactStore::new(&paths))
            .with_publisher(&ReadOnlyStore, "diabetes-data")
            .execute(&paths.clean_csv);

        assert!(result.is_ok());
        assert!(paths.model.exists());
    }
}
