//! Support vector machines
//!
//! Soft-margin SVM trained in the dual by coordinate descent. The bias is
//! folded into the kernel as `K(x, z) + 1`, which removes the equality
//! constraint and lets each dual variable be updated on its own within
//! `[0, cost]`.

use super::{check_columns, check_training_data, sigmoid, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    Linear,
    /// `exp(-sigma * |x - z|^2)`
    Rbf { sigma: f64 },
}

impl Kernel {
    pub fn eval(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { sigma } => {
                let sq: f64 = a.iter().zip(b.iter()).map(|(x, z)| (x - z).powi(2)).sum();
                (-sigma * sq).exp()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupportVectorMachine {
    kernel: Kernel,
    cost: f64,
    tolerance: f64,
    max_passes: usize,
    seed: u64,
    support_vectors: Option<Array2<f64>>,
    /// `alpha_i * y_i` for each support vector
    dual_coef: Option<Array1<f64>>,
    /// Primal weights and bias, linear kernel only
    primal: Option<(Array1<f64>, f64)>,
}

impl SupportVectorMachine {
    pub fn new(kernel: Kernel, cost: f64) -> Self {
        Self {
            kernel,
            cost,
            tolerance: 1e-3,
            max_passes: 1000,
            seed: 42,
            support_vectors: None,
            dual_coef: None,
            primal: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn n_support(&self) -> usize {
        self.dual_coef.as_ref().map_or(0, |c| c.len())
    }

    fn validate(&self) -> Result<()> {
        if !(self.cost > 0.0 && self.cost.is_finite()) {
            return Err(RiskError::InvalidParameter(format!(
                "cost must be positive, got {}",
                self.cost
            )));
        }
        if let Kernel::Rbf { sigma } = self.kernel {
            if !(sigma > 0.0 && sigma.is_finite()) {
                return Err(RiskError::InvalidParameter(format!(
                    "rbf_sigma must be positive, got {}",
                    sigma
                )));
            }
        }
        Ok(())
    }

    /// Signed distance-like score; positive means tsunami
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let sv = self.support_vectors.as_ref().ok_or(RiskError::NotFitted)?;
        let coef = self.dual_coef.as_ref().ok_or(RiskError::NotFitted)?;
        check_columns(sv.ncols(), x)?;

        if let Some((w, b)) = &self.primal {
            return Ok(x.dot(w) + *b);
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                sv.rows()
                    .into_iter()
                    .zip(coef.iter())
                    .map(|(s, c)| c * (self.kernel.eval(s, row) + 1.0))
                    .sum::<f64>()
            })
            .collect())
    }
}

impl Classifier for SupportVectorMachine {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n = x.nrows();
        let signs = y.mapv(|v| if v >= 0.5 { 1.0 } else { -1.0 });

        let mut q = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = signs[i] * signs[j] * (self.kernel.eval(x.row(i), x.row(j)) + 1.0);
                q[[i, j]] = v;
                q[[j, i]] = v;
            }
        }

        let mut alpha = Array1::<f64>::zeros(n);
        let mut grad = Array1::<f64>::from_elem(n, -1.0);
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut passes = 0;
        let mut converged = false;
        while passes < self.max_passes {
            passes += 1;
            order.shuffle(&mut rng);
            let mut max_violation: f64 = 0.0;

            for &i in &order {
                let g = grad[i];
                let projected = if alpha[i] <= 0.0 {
                    g.min(0.0)
                } else if alpha[i] >= self.cost {
                    g.max(0.0)
                } else {
                    g
                };
                max_violation = max_violation.max(projected.abs());
                if projected.abs() < 1e-12 {
                    continue;
                }

                let old = alpha[i];
                let new = (old - g / q[[i, i]]).clamp(0.0, self.cost);
                let delta = new - old;
                if delta != 0.0 {
                    alpha[i] = new;
                    grad.scaled_add(delta, &q.column(i));
                }
            }

            if max_violation < self.tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            tracing::warn!(passes, cost = self.cost, "svm dual solver hit the pass limit");
        }

        let support: Vec<usize> = (0..n).filter(|&i| alpha[i] > 0.0).collect();
        let coef: Array1<f64> = support.iter().map(|&i| alpha[i] * signs[i]).collect();
        let sv = x.select(Axis(0), &support);

        self.primal = match self.kernel {
            Kernel::Linear => Some((sv.t().dot(&coef), coef.sum())),
            Kernel::Rbf { .. } => None,
        };
        tracing::debug!(n_support = support.len(), passes, "fitted svm");

        self.support_vectors = Some(sv);
        self.dual_coef = Some(coef);
        Ok(())
    }

    /// Logistic of the decision value
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::{accuracy, blobs, ring};
    use ndarray::array;

    #[test]
    fn test_linear_svm_separates_blobs() {
        let (x, y) = blobs(30, 2, 3.0, 9);
        let mut svm = SupportVectorMachine::new(Kernel::Linear, 1.0);
        svm.fit(&x, &y).unwrap();

        let pred = svm.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.95);
        assert!(svm.n_support() < x.nrows());
    }

    #[test]
    fn test_linear_primal_matches_dual() {
        let (x, y) = blobs(15, 2, 2.0, 3);
        let mut svm = SupportVectorMachine::new(Kernel::Linear, 1.0);
        svm.fit(&x, &y).unwrap();

        let fast = svm.decision_function(&x).unwrap();
        let mut slow = svm.clone();
        slow.primal = None;
        let reference = slow.decision_function(&x).unwrap();
        for (a, b) in fast.iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rbf_handles_ring() {
        let (x, y) = ring(200, 21);
        let mut svm = SupportVectorMachine::new(Kernel::Rbf { sigma: 1.0 }, 10.0);
        svm.fit(&x, &y).unwrap();

        let pred = svm.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.9);
    }

    #[test]
    fn test_symmetric_points_score_symmetrically() {
        let x = array![[-1.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut svm = SupportVectorMachine::new(Kernel::Linear, 10.0);
        svm.fit(&x, &y).unwrap();

        let d = svm.decision_function(&x).unwrap();
        assert!(d[0] < 0.0 && d[1] > 0.0);
        assert!((d[0] + d[1]).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_cost_and_sigma() {
        let (x, y) = blobs(5, 1, 3.0, 2);
        let mut svm = SupportVectorMachine::new(Kernel::Linear, 0.0);
        assert!(svm.fit(&x, &y).is_err());
        let mut svm = SupportVectorMachine::new(Kernel::Rbf { sigma: -1.0 }, 1.0);
        assert!(svm.fit(&x, &y).is_err());
    }
}
