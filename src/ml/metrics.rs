// ============================================================
// Layer 5 - Classification Metrics
// ============================================================
// Scores a set of predictions against the true labels.
//
//   accuracy          fraction of rows predicted correctly
//   precision (class) TP / (TP + FP)
//   recall    (class) TP / (TP + FN)
//   f1        (class) harmonic mean of precision and recall
//   weighted F1       per-class F1 averaged with class support
//                     as weight; the model-selection criterion
//
// A ratio with a zero denominator is reported as 0.
//
// The classes reported are the labels that occur in either the
// true or the predicted labels, in ascending order.

use std::collections::BTreeMap;

use ndarray::ArrayView1;

use crate::domain::evaluation::{ClassMetrics, ClassificationReport, EvaluationResult};

/// Score `y_pred` against `y_true`
pub fn evaluate(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> EvaluationResult {
    let labels = present_labels(y_true, y_pred);
    let matrix = confusion_matrix(y_true, y_pred, &labels);
    let report = classification_report(&labels, &matrix);

    EvaluationResult {
        accuracy:              report.accuracy,
        f1_score:              report.weighted_avg.f1_score,
        classification_report: report,
        confusion_matrix:      matrix,
    }
}

fn present_labels(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> Vec<u8> {
    let mut labels: Vec<u8> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

/// Counts indexed by [true label][predicted label]
pub fn confusion_matrix(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>, labels: &[u8]) -> Vec<Vec<usize>> {
    let position = |l: u8| labels.iter().position(|&x| x == l);
    let mut matrix = vec![vec![0usize; labels.len()]; labels.len()];
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if let (Some(i), Some(j)) = (position(t), position(p)) {
            matrix[i][j] += 1;
        }
    }
    matrix
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) }
}

/// Per-class metrics plus accuracy, macro and weighted averages
pub fn classification_report(labels: &[u8], matrix: &[Vec<usize>]) -> ClassificationReport {
    let total: usize = matrix.iter().flatten().sum();
    let correct: usize = (0..labels.len()).map(|i| matrix[i][i]).sum();

    let mut classes = BTreeMap::new();
    let mut per_class = Vec::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        let tp        = matrix[i][i];
        let support   = matrix[i].iter().sum::<usize>();
        let predicted = matrix.iter().map(|row| row[i]).sum::<usize>();

        let precision = ratio(tp, predicted);
        let recall    = ratio(tp, support);
        let metrics   = ClassMetrics { precision, recall, f1_score: harmonic(precision, recall), support };

        per_class.push(metrics.clone());
        classes.insert(label.to_string(), metrics);
    }

    let n = per_class.len().max(1) as f64;
    let macro_avg = ClassMetrics {
        precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n,
        recall:    per_class.iter().map(|m| m.recall).sum::<f64>() / n,
        f1_score:  per_class.iter().map(|m| m.f1_score).sum::<f64>() / n,
        support:   total,
    };

    let weight = |m: &ClassMetrics| m.support as f64 / total.max(1) as f64;
    let weighted_avg = ClassMetrics {
        precision: per_class.iter().map(|m| m.precision * weight(m)).sum(),
        recall:    per_class.iter().map(|m| m.recall * weight(m)).sum(),
        f1_score:  per_class.iter().map(|m| m.f1_score * weight(m)).sum(),
        support:   total,
    };

    ClassificationReport {
        classes,
        accuracy: ratio(correct, total),
        macro_avg,
        weighted_avg,
    }
}
