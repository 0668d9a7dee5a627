// ============================================================
// Layer 5 - Candidate Models
// ============================================================
// The fixed set of classifiers the trainer compares. Declaration
// order matters: it is the fitting order and the tie-break order
// (on equal weighted F1 the earlier candidate wins).
//
//   1. Logistic Regression  C = 1.0, up to 1000 Newton steps
//   2. Random Forest        100 trees, max depth 10, seeded
//
// `TrainedModel` is a closed enum rather than a `Box<dyn>` so the
// winner can be written to disk with serde and read back with
// its concrete type intact.

use anyhow::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::domain::traits::Classifier;
use crate::ml::forest::RandomForest;
use crate::ml::logistic::LogisticRegression;

/// Hyperparameters of the candidate set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub logistic_c:        f64,
    pub logistic_max_iter: usize,
    pub forest_trees:      usize,
    pub forest_max_depth:  usize,
    pub seed:              u64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            logistic_c:        1.0,
            logistic_max_iter: 1000,
            forest_trees:      100,
            forest_max_depth:  10,
            seed:              42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl TrainedModel {
    /// Unfitted candidates, in declaration order
    pub fn candidates(cfg: &CandidateConfig) -> Vec<TrainedModel> {
        vec![
            TrainedModel::LogisticRegression(LogisticRegression::new(cfg.logistic_c, cfg.logistic_max_iter)),
            TrainedModel::RandomForest(RandomForest::new(cfg.forest_trees, cfg.forest_max_depth, cfg.seed)),
        ]
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::RandomForest(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::RandomForest(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: ArrayView2<f64>) -> Array1<u8> {
        self.inner().predict(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.inner().feature_importances()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order() {
        let names: Vec<_> = TrainedModel::candidates(&CandidateConfig::default())
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["Logistic Regression", "Random Forest"]);
    }

    #[test]
    fn test_only_the_forest_has_importances() {
        let models = TrainedModel::candidates(&CandidateConfig::default());
        assert!(models[0].feature_importances().is_none());
        assert!(models[1].feature_importances().is_some());
    }

    #[test]
    fn test_serde_keeps_the_concrete_type() {
        let model = TrainedModel::candidates(&CandidateConfig::default()).remove(1);
        let json  = serde_json::to_string(&model).unwrap();
        let back: TrainedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
