//! Penalized logistic regression
//!
//! Fits the elastic-net objective
//! `log_loss + penalty * (mixture * |w|_1 + (1 - mixture) / 2 * |w|_2^2)`
//! with proximal gradient descent. `mixture = 1` is the lasso, `mixture = 0`
//! is ridge. The intercept is never penalized.

use super::{check_columns, check_training_data, sigmoid, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};

/// Logistic Regression classifier
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Intercept term
    pub intercept: Option<f64>,
    /// Overall regularization strength
    penalty: f64,
    /// Share of the penalty that is L1
    mixture: f64,
    learning_rate: f64,
    max_iter: usize,
    tolerance: f64,
    /// Cost history during training
    pub cost_history: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::elastic_net(0.0, 0.0)
    }
}

impl LogisticRegression {
    /// Create a model with the given elastic-net penalty and L1 mixture
    pub fn elastic_net(penalty: f64, mixture: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            penalty,
            mixture,
            learning_rate: 0.1,
            max_iter: 2000,
            tolerance: 1e-7,
            cost_history: Vec::new(),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.penalty >= 0.0 && self.penalty.is_finite()) {
            return Err(RiskError::InvalidParameter(format!(
                "penalty must be non-negative, got {}",
                self.penalty
            )));
        }
        if !(0.0..=1.0).contains(&self.mixture) {
            return Err(RiskError::InvalidParameter(format!(
                "mixture must be in [0, 1], got {}",
                self.mixture
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(RiskError::InvalidParameter(
                "learning rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn objective(&self, y: &Array1<f64>, proba: &Array1<f64>, weights: &Array1<f64>) -> f64 {
        let l1: f64 = weights.iter().map(|w| w.abs()).sum();
        let l2: f64 = weights.iter().map(|w| w * w).sum();
        crate::metrics::classification::log_loss(y, proba)
            + self.penalty * (self.mixture * l1 + 0.5 * (1.0 - self.mixture) * l2)
    }

    /// Log-odds for each row
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self.coefficients.as_ref().ok_or(RiskError::NotFitted)?;
        let bias = self.intercept.ok_or(RiskError::NotFitted)?;
        check_columns(weights.len(), x)?;

        Ok(x.dot(weights) + bias)
    }

    /// Coefficients paired with feature names, largest magnitude first
    pub fn summary(&self, feature_names: &[String]) -> String {
        let mut s = String::new();
        s.push_str("Logistic Regression Summary\n");
        s.push_str("===========================\n\n");

        let Some(coef) = self.coefficients.as_ref() else {
            s.push_str("Model not fitted yet.\n");
            return s;
        };

        s.push_str(&format!(
            "Intercept: {:.6}\n\n",
            self.intercept.unwrap_or(0.0)
        ));
        s.push_str("Coefficients (log-odds):\n");

        let mut pairs: Vec<(&String, f64)> = feature_names.iter().zip(coef.iter().copied()).collect();
        pairs.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(std::cmp::Ordering::Equal));
        for (i, (name, c)) in pairs.iter().enumerate() {
            s.push_str(&format!(
                "  {:3}. {:20}: {:>10.6} (OR: {:.4})\n",
                i + 1,
                name,
                c,
                c.exp()
            ));
        }
        s
    }
}

/// Soft-thresholding operator, the proximal map of the L1 norm
fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();

        let mut weights = Array1::<f64>::zeros(n_features);
        let base_rate = (y.sum() / n_samples).clamp(1e-6, 1.0 - 1e-6);
        let mut bias = (base_rate / (1.0 - base_rate)).ln();

        let l1_step = self.learning_rate * self.penalty * self.mixture;
        let l2 = self.penalty * (1.0 - self.mixture);

        self.cost_history.clear();

        for iter in 0..self.max_iter {
            let predictions = (x.dot(&weights) + bias).mapv(sigmoid);

            let errors = &predictions - y;
            let dw = x.t().dot(&errors) / n_samples + &weights * l2;
            let db = errors.sum() / n_samples;

            weights = (&weights - &(dw * self.learning_rate)).mapv(|w| soft_threshold(w, l1_step));
            bias -= self.learning_rate * db;

            let cost = self.objective(y, &predictions, &weights);
            self.cost_history.push(cost);

            if iter > 0 && (self.cost_history[iter - 1] - cost).abs() < self.tolerance {
                tracing::debug!(iter, cost, "logistic regression converged");
                break;
            }
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::{accuracy, blobs};

    #[test]
    fn test_separable_blobs() {
        let (x, y) = blobs(40, 3, 3.0, 7);
        let mut model = LogisticRegression::elastic_net(1e-4, 0.0);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.95);
        assert!(model.coefficients.as_ref().unwrap().iter().all(|&w| w > 0.0));
    }

    #[test]
    fn test_lasso_zeroes_noise_features() {
        let (mut x, y) = blobs(40, 3, 3.0, 11);
        // Replace the last column with label-independent noise
        for i in 0..x.nrows() {
            x[[i, 2]] = if i % 2 == 0 { 0.3 } else { -0.3 };
        }
        let mut model = LogisticRegression::elastic_net(0.5, 1.0);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.unwrap();
        assert_eq!(coef[2], 0.0);
    }

    #[test]
    fn test_stronger_penalty_shrinks() {
        let (x, y) = blobs(30, 2, 2.0, 3);
        let mut weak = LogisticRegression::elastic_net(1e-4, 0.0);
        let mut strong = LogisticRegression::elastic_net(1.0, 0.0);
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();

        let norm = |m: &LogisticRegression| m.coefficients.as_ref().unwrap().iter().map(|w| w * w).sum::<f64>();
        assert!(norm(&strong) < norm(&weak));
    }

    #[test]
    fn test_invalid_mixture() {
        let (x, y) = blobs(5, 2, 2.0, 1);
        let mut model = LogisticRegression::elastic_net(0.1, 1.5);
        assert!(matches!(model.fit(&x, &y), Err(RiskError::InvalidParameter(_))));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::default();
        let x = Array2::zeros((2, 2));
        assert!(matches!(model.predict_proba(&x), Err(RiskError::NotFitted)));
    }
}
