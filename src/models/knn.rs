//! K-Nearest Neighbors classifier
//!
//! Scores a sample by the weighted share of tsunami events among its k
//! closest training examples in Euclidean distance.

use super::{check_columns, check_training_data, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kernel used to weight neighbor votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightFunc {
    /// All neighbors have equal weight
    Rectangular,
    /// Weight by inverse of distance
    Inverse,
    /// Linearly decaying weight, zero at the (k+1)-th neighbor's distance
    Triangular,
}

impl fmt::Display for WeightFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightFunc::Rectangular => "rectangular",
            WeightFunc::Inverse => "inverse",
            WeightFunc::Triangular => "triangular",
        };
        f.write_str(name)
    }
}

impl FromStr for WeightFunc {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangular" | "uniform" => Ok(WeightFunc::Rectangular),
            "inverse" | "distance" => Ok(WeightFunc::Inverse),
            "triangular" => Ok(WeightFunc::Triangular),
            other => Err(RiskError::InvalidParameter(format!(
                "unknown weight function: {}",
                other
            ))),
        }
    }
}

/// KNN Classifier
#[derive(Debug, Clone)]
pub struct KNNClassifier {
    k: usize,
    weights: WeightFunc,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNClassifier {
    /// Create a new KNN classifier
    ///
    /// # Arguments
    /// * `k` - Number of neighbors to consider
    pub fn new(k: usize) -> Self {
        Self {
            k,
            weights: WeightFunc::Rectangular,
            x_train: None,
            y_train: None,
        }
    }

    /// Set the weighting scheme
    pub fn with_weights(mut self, weights: WeightFunc) -> Self {
        self.weights = weights;
        self
    }

    /// Number of neighbors actually used, bounded by the training size
    pub fn effective_k(&self) -> usize {
        let n = self.x_train.as_ref().map_or(self.k, |x| x.nrows());
        self.k.min(n)
    }

    fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Weighted positive share among the neighbors of one sample
    fn score(&self, sample: ArrayView1<f64>, x_train: &Array2<f64>, y_train: &Array1<f64>) -> f64 {
        let mut distances: Vec<(usize, f64)> = x_train
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| (i, Self::distance(sample, row)))
            .collect();
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let k = self.effective_k();
        // Distance of the first excluded neighbor scales the triangular kernel
        let bandwidth = distances
            .get(k)
            .or_else(|| distances.last())
            .map_or(0.0, |d| d.1);
        let neighbors = &distances[..k];

        let weights: Vec<f64> = match self.weights {
            WeightFunc::Rectangular => vec![1.0; k],
            WeightFunc::Inverse => {
                if neighbors.iter().any(|(_, d)| *d == 0.0) {
                    // Exact matches outvote everything else
                    neighbors.iter().map(|(_, d)| if *d == 0.0 { 1.0 } else { 0.0 }).collect()
                } else {
                    neighbors.iter().map(|(_, d)| 1.0 / d).collect()
                }
            }
            WeightFunc::Triangular => {
                if bandwidth > 0.0 {
                    neighbors.iter().map(|(_, d)| (1.0 - d / bandwidth).max(0.0)).collect()
                } else {
                    vec![1.0; k]
                }
            }
        };

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            // Every neighbor sits on the bandwidth; fall back to a plain vote
            return neighbors.iter().map(|(i, _)| y_train[*i]).sum::<f64>() / k as f64;
        }

        neighbors
            .iter()
            .zip(weights.iter())
            .map(|((i, _), w)| w * y_train[*i])
            .sum::<f64>()
            / total
    }
}

impl Classifier for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.k == 0 {
            return Err(RiskError::InvalidParameter(
                "neighbors must be at least 1".to_string(),
            ));
        }
        if self.k > x.nrows() {
            tracing::debug!(k = self.k, n = x.nrows(), "clamping neighbors to training size");
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(RiskError::NotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(RiskError::NotFitted)?;
        check_columns(x_train.ncols(), x)?;

        Ok(x.rows()
            .into_iter()
            .map(|sample| self.score(sample, x_train, y_train))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::{accuracy, ring};
    use ndarray::array;

    #[test]
    fn test_knn_classifier() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [1.0, 1.0], [1.1, 1.1]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut knn = KNNClassifier::new(3);
        knn.fit(&x, &y).unwrap();

        let test = array![[0.05, 0.05], [1.05, 1.05]];
        let proba = knn.predict_proba(&test).unwrap();
        assert!((proba[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((proba[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_weights_favor_close_points() {
        let x = array![[0.0], [1.0], [10.0]];
        let y = array![1.0, 0.0, 0.0];

        let mut knn = KNNClassifier::new(3).with_weights(WeightFunc::Inverse);
        knn.fit(&x, &y).unwrap();
        let p = knn.predict_proba(&array![[0.1]]).unwrap();
        // weights 10, 1/0.9, 1/9.9
        let expected = 10.0 / (10.0 + 1.0 / 0.9 + 1.0 / 9.9);
        assert!((p[0] - expected).abs() < 1e-9);

        let exact = knn.predict_proba(&array![[0.0]]).unwrap();
        assert_eq!(exact[0], 1.0);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![0.0, 1.0, 1.0];
        let mut knn = KNNClassifier::new(10).with_weights(WeightFunc::Triangular);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.effective_k(), 3);

        let p = knn.predict_proba(&array![[1.0]]).unwrap();
        assert!((0.0..=1.0).contains(&p[0]));
    }

    #[test]
    fn test_nonlinear_boundary() {
        let (x, y) = ring(300, 4);
        let mut knn = KNNClassifier::new(7).with_weights(WeightFunc::Triangular);
        knn.fit(&x, &y).unwrap();
        let pred = knn.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.85);
    }

    #[test]
    fn test_weight_func_parsing() {
        assert_eq!("Inverse".parse::<WeightFunc>().unwrap(), WeightFunc::Inverse);
        assert!("gaussian".parse::<WeightFunc>().is_err());
    }
}
