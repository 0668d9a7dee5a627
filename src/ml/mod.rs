// ============================================================
// Layer 5 - Machine Learning Layer
// ============================================================
// The learning algorithms and how they are judged. Nothing in
// here reads files or knows about stages; it takes dense
// matrices in and hands fitted models and scores back.
//
//   metrics.rs   - accuracy, weighted F1, classification
//                  report, confusion matrix
//   logistic.rs  - L2 logistic regression (Newton / IRLS)
//   forest.rs    - bagged CART random forest with Gini
//                  importances
//   model.rs     - the fixed, ordered candidate set
//   trainer.rs   - fit every candidate, score it, select one

pub mod metrics;

pub mod logistic;

pub mod forest;

pub mod model;

pub mod trainer;
