//! Classification models
//!
//! Every estimator implements [`Classifier`] over `ndarray` matrices and
//! predicts the probability of the tsunami class. [`ModelKind`] and
//! [`Hyperparameters`] describe a configured model independently of its
//! fitted state.

pub mod boosted;
pub mod decision_tree;
pub mod knn;
pub mod lda;
pub mod logistic;
pub mod params;
pub mod random_forest;
pub mod svm;

pub use boosted::{BoostConfig, GradientBoosting};
pub use decision_tree::{DecisionTree, TaskType, TreeConfig};
pub use knn::{KNNClassifier, WeightFunc};
pub use lda::LinearDiscriminant;
pub use logistic::LogisticRegression;
pub use params::{Hyperparameters, ModelKind};
pub use random_forest::{ForestConfig, RandomForest};
pub use svm::{Kernel, SupportVectorMachine};

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};

/// Binary classifier predicting P(tsunami)
pub trait Classifier: Send + Sync {
    /// Fit the model to a feature matrix and 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard class labels at the 0.5 threshold
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Normalized feature importances, for models that track them
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Validate training inputs shared by every model
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(RiskError::DimensionMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }
    if x.nrows() == 0 {
        return Err(RiskError::EmptyData("no training rows".to_string()));
    }
    Ok(())
}

/// Validate that prediction input has the fitted number of columns
pub(crate) fn check_columns(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(RiskError::DimensionMismatch {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

#[cfg(test)]
pub(crate) mod test_data {
    use ndarray::{Array1, Array2};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Two Gaussian-ish blobs separated along every axis
    pub fn blobs(n_per_class: usize, n_features: usize, gap: f64, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = 2 * n_per_class;
        let mut x = Array2::zeros((n, n_features));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let class = if i < n_per_class { 0.0 } else { 1.0 };
            y[i] = class;
            for j in 0..n_features {
                x[[i, j]] = class * gap + rng.gen_range(-1.0..1.0);
            }
        }
        (x, y)
    }

    /// Positive inside a ring, negative in the centre and outside
    pub fn ring(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 2));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let a: f64 = rng.gen_range(-3.0..3.0);
            let b: f64 = rng.gen_range(-3.0..3.0);
            x[[i, 0]] = a;
            x[[i, 1]] = b;
            let r = (a * a + b * b).sqrt();
            y[i] = if (1.0..2.2).contains(&r) { 1.0 } else { 0.0 };
        }
        (x, y)
    }

    pub fn accuracy(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
        y.iter()
            .zip(pred.iter())
            .filter(|(a, b)| (*a - *b).abs() < 0.5)
            .count() as f64
            / y.len() as f64
    }
}
