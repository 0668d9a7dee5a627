// ============================================================
// Layer 3 - Evaluation Results
// ============================================================
// What the trainer records about each candidate model, and the
// metrics document written next to the winning model:
//
//   {
//     "best_model": "Random Forest",
//     "results": {
//       "Logistic Regression": { accuracy, f1_score,
//                                classification_report,
//                                confusion_matrix },
//       "Random Forest":       { ... }
//     },
//     "feature_importance": { "age": 0.12, ... } | null,
//     "features": ["age", "bmi", ...]
//   }
//
// Results are kept for every candidate even though only the
// winner's model is persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Precision / recall / F1 for one class (or one average)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall:    f64,
    #[serde(rename = "f1-score")]
    pub f1_score:  f64,
    pub support:   usize,
}

/// Per-class metrics plus the overall accuracy and the two
/// conventional averages, serialised as one flat mapping keyed
/// by class label, "accuracy", "macro avg" and "weighted avg".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(flatten)]
    pub classes:      BTreeMap<String, ClassMetrics>,
    pub accuracy:     f64,
    #[serde(rename = "macro avg")]
    pub macro_avg:    ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
}

/// Held-out scores of one candidate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub accuracy:              f64,
    /// Weighted F1, the selection criterion
    pub f1_score:              f64,
    pub classification_report: ClassificationReport,
    /// rows = true label, columns = predicted label
    pub confusion_matrix:      Vec<Vec<usize>>,
}

/// The JSON metrics document persisted by the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub best_model:         String,
    pub results:            BTreeMap<String, EvaluationResult>,
    /// `null` when the winning model exposes no importances
    pub feature_importance: Option<BTreeMap<String, f64>>,
    /// Feature columns the candidates were trained on, in matrix order
    #[serde(default)]
    pub features:           Vec<String>,
}
