// ============================================================
// Layer 5 - Candidate Training and Selection
// ============================================================
// Fits every candidate on the same training rows, scores each
// on the same held-out rows, and picks one winner.
//
// Selection is a fold over the candidates in declaration order
// comparing weighted F1. Only a strictly higher score replaces
// the current best, so ties go to the earlier candidate. A NaN
// score never wins.

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis};

use crate::data::features::FeatureMatrix;
use crate::domain::evaluation::EvaluationResult;
use crate::domain::traits::Classifier;
use crate::ml::metrics::evaluate;
use crate::ml::model::TrainedModel;

/// A fitted candidate and its held-out scores
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    pub name:       &'static str,
    pub model:      TrainedModel,
    pub evaluation: EvaluationResult,
}

/// Train/test views of a feature matrix
pub struct SplitData {
    pub x_train: Array2<f64>,
    pub y_train: Array1<u8>,
    pub x_test:  Array2<f64>,
    pub y_test:  Array1<u8>,
}

impl SplitData {
    pub fn from_indices(features: &FeatureMatrix, train: &[usize], test: &[usize]) -> Self {
        Self {
            x_train: features.x.select(Axis(0), train),
            y_train: features.y.select(Axis(0), train),
            x_test:  features.x.select(Axis(0), test),
            y_test:  features.y.select(Axis(0), test),
        }
    }
}

/// Fit and score each candidate independently, preserving order
pub fn fit_candidates(candidates: Vec<TrainedModel>, split: &SplitData) -> Result<Vec<CandidateOutcome>> {
    candidates
        .into_iter()
        .map(|mut model| {
            let name = model.name();
            tracing::info!("Training {}...", name);

            model
                .fit(split.x_train.view(), split.y_train.view())
                .with_context(|| format!("Fitting '{name}' failed"))?;

            let predictions = model.predict(split.x_test.view());
            let evaluation  = evaluate(split.y_test.view(), predictions.view());
            tracing::info!(
                "{}: accuracy {:.4}, weighted F1 {:.4}",
                name,
                evaluation.accuracy,
                evaluation.f1_score
            );

            Ok(CandidateOutcome { name, model, evaluation })
        })
        .collect()
}

/// Index of the best score; first wins on ties, `None` if empty
pub fn select_best(scores: impl IntoIterator<Item = f64>) -> Option<usize> {
    scores
        .into_iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, score)| match best {
            _ if score.is_nan() => best,
            Some((_, top)) if score <= top => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CandidateConfig;
    use ndarray::array;

    #[test]
    fn test_select_best_picks_highest() {
        assert_eq!(select_best([0.7, 0.9, 0.8]), Some(1));
    }

    #[test]
    fn test_select_best_tie_goes_to_first_declared() {
        assert_eq!(select_best([0.85, 0.85]), Some(0));
        assert_eq!(select_best([0.5, 0.85, 0.85]), Some(1));
    }

    #[test]
    fn test_select_best_ignores_nan_and_empty() {
        assert_eq!(select_best([f64::NAN, 0.1]), Some(1));
        assert_eq!(select_best(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_fit_candidates_keeps_declaration_order() {
        let cfg = CandidateConfig { forest_trees: 5, forest_max_depth: 3, ..Default::default() };
        let x = array![[-2.0], [-1.0], [-0.5], [0.5], [1.0], [2.0], [-1.5], [1.5]];
        let y = array![0u8, 0, 0, 1, 1, 1, 0, 1];
        let split = SplitData { x_train: x.clone(), y_train: y.clone(), x_test: x, y_test: y };

        let outcomes = fit_candidates(TrainedModel::candidates(&cfg), &split).unwrap();
        let names: Vec<_> = outcomes.iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Logistic Regression", "Random Forest"]);
        assert_eq!(outcomes[0].evaluation.accuracy, 1.0);
    }
}
