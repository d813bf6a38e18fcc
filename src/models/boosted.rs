//! Gradient boosted trees for binary log-loss
//!
//! Each round fits a regression tree to the log-loss gradients
//! `y - p` with the Hessians `p (1 - p)` as weights, so every leaf is a
//! regularized Newton step on the log-odds.

use super::decision_tree::{DecisionTree, TaskType, TreeConfig};
use super::{check_columns, check_training_data, sigmoid, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, Zip};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostConfig {
    /// Number of boosting iterations (trees)
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Subsample ratio of the training instances
    pub subsample: f64,
    /// L2 penalty on leaf values
    pub leaf_l2: f64,
    pub seed: u64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 3,
            learning_rate: 0.1,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            leaf_l2: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: BoostConfig,
    /// Initial log-odds
    base_score: f64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    /// Training log-loss after each round
    pub train_loss: Vec<f64>,
}

impl GradientBoosting {
    pub fn new(config: BoostConfig) -> Self {
        Self {
            config,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: 0,
            train_loss: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.n_trees == 0 {
            return Err(RiskError::InvalidParameter("trees must be at least 1".to_string()));
        }
        if !(c.learning_rate > 0.0 && c.learning_rate <= 1.0) {
            return Err(RiskError::InvalidParameter(format!(
                "learn_rate must be in (0, 1], got {}",
                c.learning_rate
            )));
        }
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(RiskError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                c.subsample
            )));
        }
        Ok(())
    }

    /// Raw log-odds for each row
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::NotFitted);
        }
        check_columns(self.n_features, x)?;

        let mut scores = Array1::from_elem(x.nrows(), self.base_score);
        for tree in &self.trees {
            scores.scaled_add(self.config.learning_rate, &tree.predict_values(x)?);
        }
        Ok(scores)
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.nrows();
        let base_rate = (y.sum() / n_samples as f64).clamp(1e-6, 1.0 - 1e-6);
        self.base_score = (base_rate / (1.0 - base_rate)).ln();
        self.n_features = x.ncols();
        self.trees.clear();
        self.train_loss.clear();

        let sample_size = ((n_samples as f64 * self.config.subsample).round() as usize).max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut rows: Vec<usize> = (0..n_samples).collect();

        let mut scores = Array1::from_elem(n_samples, self.base_score);
        for round in 0..self.config.n_trees {
            let proba = scores.mapv(sigmoid);
            let gradients = y - &proba;
            let hessians = proba.mapv(|p| (p * (1.0 - p)).max(1e-12));

            if sample_size < n_samples {
                rows.shuffle(&mut rng);
            }

            let mut tree = DecisionTree::new(TreeConfig {
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                min_samples_leaf: self.config.min_samples_leaf,
                max_features: None,
                seed: self.config.seed.wrapping_add(round as u64),
                task: TaskType::Regression,
                leaf_l2: self.config.leaf_l2,
            });
            tree.fit_indices(x, &gradients, &rows[..sample_size], Some(&hessians))?;

            let update = tree.predict_values(x)?;
            scores.scaled_add(self.config.learning_rate, &update);
            self.trees.push(tree);

            let loss = crate::metrics::classification::log_loss(y, &scores.mapv(sigmoid));
            self.train_loss.push(loss);
        }

        tracing::debug!(
            n_trees = self.trees.len(),
            final_loss = self.train_loss.last().copied().unwrap_or(f64::NAN),
            "fitted boosted trees"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Split gain accumulated over all rounds
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let mut total = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            Zip::from(&mut total)
                .and(&Array1::from(tree.importances().to_vec()))
                .for_each(|t, &imp| *t += imp);
        }
        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        Some(total.to_vec())
    }
}
