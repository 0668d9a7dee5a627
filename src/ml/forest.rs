// ============================================================
// Layer 5 - Random Forest
// ============================================================
// Bagged ensemble of CART decision trees for binary labels.
//
// Per tree:
//   1. Draw a bootstrap sample (n rows with replacement)
//   2. Grow a tree by recursive binary splits, each chosen as
//      the best Gini decrease over √(features) randomly picked
//      features, until max_depth or a pure node
//   3. Leaves store the fraction of positive training rows
//
// Prediction averages the leaf fractions over all trees and
// thresholds at 0.5 (soft voting).
//
// Feature importance is the mean decrease in impurity: each
// split credits its feature with the weighted Gini decrease,
// normalised per tree, averaged over trees.
//
// All randomness comes from one `StdRng` seeded from `seed`,
// which hands each tree its own seed in a fixed order. Same
// data + same seed → identical forest.

use anyhow::{bail, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::traits::Classifier;

// ─── Tree ─────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Fraction of positive rows that reached this leaf
        positive: f64,
    },
    Split {
        feature:   usize,
        threshold: f64,
        /// Index of the `x <= threshold` child
        left:      usize,
        /// Index of the `x > threshold` child
        right:     usize,
    },
}

/// A fitted decision tree stored as a flat node list; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    fn positive_fraction(&self, row: ArrayView1<f64>) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { positive } => return *positive,
                Node::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Working state while growing one tree
struct TreeBuilder<'x, 'y> {
    x:            ArrayView2<'x, f64>,
    y:            ArrayView1<'y, u8>,
    max_depth:    usize,
    max_features: usize,
    nodes:        Vec<Node>,
    importances:  Vec<f64>,
    rng:          StdRng,
}

struct BestSplit {
    feature:   usize,
    threshold: f64,
    decrease:  f64,
    /// Rows sorted by the split feature; first `n_left` go left
    order:     Vec<usize>,
    n_left:    usize,
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

impl TreeBuilder<'_, '_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id        = self.nodes.len();
        let total     = rows.len();
        let positives = rows.iter().filter(|&&r| self.y[r] == 1).count();
        self.nodes.push(Node::Leaf { positive: positives as f64 / total.max(1) as f64 });

        if depth >= self.max_depth || total < 2 || positives == 0 || positives == total {
            return id;
        }

        let Some(best) = self.best_split(&rows, positives) else {
            return id;
        };

        self.importances[best.feature] += best.decrease;

        let mut order = best.order;
        let right_rows = order.split_off(best.n_left);
        let left  = self.grow(order, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split { feature: best.feature, threshold: best.threshold, left, right };
        id
    }

    fn best_split(&mut self, rows: &[usize], positives: usize) -> Option<BestSplit> {
        let n_features = self.x.ncols();
        let total      = rows.len();
        let parent     = total as f64 * gini(positives, total);

        let candidates = index::sample(&mut self.rng, n_features, self.max_features.min(n_features));
        let mut best: Option<BestSplit> = None;

        for feature in candidates.iter() {
            let mut order = rows.to_vec();
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left_pos = 0usize;
            let mut best_here: Option<(f64, f64, usize)> = None;
            for i in 0..total - 1 {
                left_pos += usize::from(self.y[order[i]] == 1);
                let here = self.x[[order[i], feature]];
                let next = self.x[[order[i + 1], feature]];
                if here == next {
                    continue;
                }

                let n_left  = i + 1;
                let n_right = total - n_left;
                let child = n_left as f64 * gini(left_pos, n_left)
                    + n_right as f64 * gini(positives - left_pos, n_right);
                let decrease = parent - child;

                if best_here.map_or(true, |(d, _, _)| decrease > d) {
                    best_here = Some((decrease, (here + next) / 2.0, n_left));
                }
            }

            if let Some((decrease, threshold, n_left)) = best_here {
                if decrease > 0.0 && best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    best = Some(BestSplit { feature, threshold, decrease, order, n_left });
                }
            }
        }

        best
    }
}

// ─── Forest ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth:    usize,
    pub seed:         u64,
    pub trees:        Vec<DecisionTree>,
    /// Normalised mean decrease in impurity per feature
    pub importances:  Vec<f64>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, max_depth: usize, seed: u64) -> Self {
        Self { n_estimators, max_depth, seed, trees: Vec::new(), importances: Vec::new() }
    }

    /// Mean positive fraction over all trees, per row
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array1<f64> {
        let n_trees = self.trees.len().max(1) as f64;
        x.rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.positive_fraction(row)).sum::<f64>() / n_trees)
            .collect()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "Random Forest"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<()> {
        let (n, d) = x.dim();
        if n == 0 || n != y.len() {
            bail!("random forest needs matching, non-empty x ({n} rows) and y ({} labels)", y.len());
        }
        if self.n_estimators == 0 {
            bail!("random forest needs at least one tree");
        }

        let max_features = ((d as f64).sqrt() as usize).max(1);
        let mut master   = StdRng::seed_from_u64(self.seed);
        let mut totals   = vec![0.0f64; d];

        self.trees.clear();
        for t in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let mut builder = TreeBuilder {
                x,
                y,
                max_depth: self.max_depth,
                max_features,
                nodes: Vec::new(),
                importances: vec![0.0; d],
                rng,
            };
            builder.grow(sample, 0);

            let sum: f64 = builder.importances.iter().sum();
            if sum > 0.0 {
                for (total, imp) in totals.iter_mut().zip(&builder.importances) {
                    *total += imp / sum;
                }
            }
            self.trees.push(DecisionTree { nodes: builder.nodes });

            if (t + 1) % 25 == 0 {
                tracing::debug!("Grew {}/{} trees", t + 1, self.n_estimators);
            }
        }

        let sum: f64 = totals.iter().sum();
        self.importances = if sum > 0.0 {
            totals.iter().map(|v| v / sum).collect()
        } else {
            totals
        };
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Array1<u8> {
        self.predict_proba(x).mapv(|p| u8::from(p >= 0.5))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.importances.clone())
    }
}
