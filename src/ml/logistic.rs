// ============================================================
// Layer 5 - Logistic Regression
// ============================================================
// L2-regularised binary logistic regression, fitted with
// Newton's method (iteratively reweighted least squares).
//
// Objective (intercept not penalised):
//
//   L(w, b) = Σ logloss(yᵢ, σ(xᵢ·w + b)) + ||w||² / (2C)
//
// Each iteration solves H·Δ = g for the Newton step, where
//
//   g = Xᵀ(p - y) + w / C
//   H = Xᵀ diag(p(1-p)) X + I / C
//
// with X augmented by a column of ones for the intercept.
// Newton converges in a handful of iterations on a problem this
// size, and starting from zero makes the fit fully
// deterministic.

use anyhow::{bail, Result};
use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::traits::Classifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularisation strength
    pub c:         f64,
    pub max_iter:  usize,
    /// Stop when the largest Newton step component is below this
    pub tol:       f64,
    pub coef:      Vec<f64>,
    pub intercept: f64,
    /// Iterations actually run by the last fit
    pub n_iter:    usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 1000)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize) -> Self {
        Self { c, max_iter, tol: 1e-8, coef: Vec::new(), intercept: 0.0, n_iter: 0 }
    }

    /// P(label = 1) for every row
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array1<f64> {
        let w = ArrayView1::from(&self.coef[..]);
        x.dot(&w).mapv(|z| sigmoid(z + self.intercept))
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "Logistic Regression"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<()> {
        let (n, d) = x.dim();
        if n == 0 || n != y.len() {
            bail!("logistic regression needs matching, non-empty x ({n} rows) and y ({} labels)", y.len());
        }

        // [x | 1]: last parameter is the intercept
        let xa = concatenate![Axis(1), x, Array2::<f64>::ones((n, 1))];
        let y  = y.mapv(f64::from);
        let mut theta = Array1::<f64>::zeros(d + 1);

        let mut penalty = Array1::from_elem(d + 1, 1.0 / self.c);
        penalty[d] = 1e-10;

        self.n_iter = 0;
        for _ in 0..self.max_iter {
            self.n_iter += 1;

            let p = xa.dot(&theta).mapv(sigmoid);
            let s = &p * &(1.0 - &p);

            let mut grad = xa.t().dot(&(&p - &y));
            grad.zip_mut_with(&(&theta * &penalty), |g, r| *g += r);

            let weighted = &xa * &s.view().insert_axis(Axis(1));
            let mut hess = xa.t().dot(&weighted);
            for i in 0..=d {
                hess[[i, i]] += penalty[i];
            }

            let step = solve(hess, grad)?;
            theta -= &step;

            if step.iter().fold(0.0f64, |m, v| m.max(v.abs())) < self.tol {
                break;
            }
        }

        self.coef      = theta.slice(ndarray::s![..d]).to_vec();
        self.intercept = theta[d];
        tracing::debug!("Logistic regression converged after {} iterations", self.n_iter);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Array1<u8> {
        self.predict_proba(x).mapv(|p| u8::from(p >= 0.5))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Solve a·x = b by Gaussian elimination with partial pivoting
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-300 {
            bail!("singular Hessian at column {col}");
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}
