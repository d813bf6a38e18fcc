//! Random Forest implementation

use super::decision_tree::{DecisionTree, TaskType, TreeConfig};
use super::{check_columns, check_training_data, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split (`min_n`)
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features sampled at each split (`mtry`, sqrt of total if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
    /// Out-of-bag score calculation
    pub oob_score: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 32,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
            oob_score: true,
        }
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
    oob_score_value: Option<f64>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
            oob_score_value: None,
        }
    }

    /// Create with default classification config
    pub fn default_classification() -> Self {
        Self::new(ForestConfig::default())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Out-of-bag accuracy, when bootstrap and OOB scoring are enabled
    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score_value
    }

    /// `mtry` clamped to the available number of features
    fn resolve_max_features(&self, n_features: usize) -> usize {
        self.config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features.max(1))
    }

    fn bootstrap_indices(n_samples: usize, seed: u64) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
    }

    fn tree_seed(&self, tree_idx: usize) -> u64 {
        self.config.seed.wrapping_add(tree_idx as u64)
    }

    /// Calculate out-of-bag accuracy
    fn calculate_oob_score(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let mut sums = vec![0.0; n_samples];
        let mut counts = vec![0usize; n_samples];

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let mut in_bag = vec![false; n_samples];
            for i in Self::bootstrap_indices(n_samples, self.tree_seed(tree_idx)) {
                in_bag[i] = true;
            }
            for i in (0..n_samples).filter(|&i| !in_bag[i]) {
                sums[i] += tree.predict_row(x.row(i))?;
                counts[i] += 1;
            }
        }

        let mut correct = 0usize;
        let mut total = 0usize;
        for i in 0..n_samples {
            if counts[i] == 0 {
                continue;
            }
            let pred_class = sums[i] / counts[i] as f64 >= 0.5;
            if pred_class == (y[i] >= 0.5) {
                correct += 1;
            }
            total += 1;
        }

        self.oob_score_value = (total > 0).then(|| correct as f64 / total as f64);
        Ok(())
    }
}

impl Classifier for RandomForest {
    /// Train the random forest
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.config.n_trees == 0 {
            return Err(RiskError::InvalidParameter(
                "a forest needs at least one tree".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let max_features = self.resolve_max_features(n_features);
        if self.config.max_features.is_some_and(|m| m != max_features) {
            tracing::debug!(requested = ?self.config.max_features, max_features, "clamped mtry");
        }

        // Build trees in parallel
        let trees: Vec<DecisionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let tree_config = TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed: self.tree_seed(i),
                    task: TaskType::Classification,
                    leaf_l2: 0.0,
                };

                let mut tree = DecisionTree::new(tree_config);
                let indices = if self.config.bootstrap {
                    Self::bootstrap_indices(n_samples, self.tree_seed(i))
                } else {
                    (0..n_samples).collect()
                };
                tree.fit_indices(x, y, &indices, None)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = n_features;

        // Aggregate feature importances
        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }

        // Normalize
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        self.oob_score_value = None;
        if self.config.oob_score && self.config.bootstrap {
            self.calculate_oob_score(x, y)?;
        }

        tracing::debug!(
            n_trees = self.trees.len(),
            max_features,
            oob = ?self.oob_score_value,
            "fitted random forest"
        );
        Ok(())
    }

    /// Mean of the trees' leaf probabilities
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::NotFitted);
        }
        check_columns(self.n_features, x)?;

        let mut total = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            total = total + tree.predict_values(x)?;
        }
        Ok((total / self.trees.len() as f64).mapv(|p| p.clamp(0.0, 1.0)))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.feature_importances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::{accuracy, blobs, ring};

    fn small_forest(seed: u64) -> RandomForest {
        RandomForest::new(ForestConfig {
            n_trees: 25,
            max_features: Some(1),
            seed,
            ..Default::default()
        })
    }

    #[test]
    fn test_forest_learns_ring() {
        let (x, y) = ring(300, 8);
        let mut forest = small_forest(1);
        forest.fit(&x, &y).unwrap();

        assert_eq!(forest.n_trees(), 25);
        let pred = forest.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.9);
        assert!(forest.oob_score().unwrap() > 0.7);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs(30, 3, 1.0, 2);
        let mut a = small_forest(5);
        let mut b = small_forest(5);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (mut x, y) = blobs(30, 3, 3.0, 3);
        for i in 0..x.nrows() {
            x[[i, 2]] = 0.0;
        }
        let mut forest = small_forest(7);
        forest.fit(&x, &y).unwrap();

        let imp = forest.feature_importances().unwrap();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(imp[2], 0.0);
    }

    #[test]
    fn test_mtry_larger_than_features_is_clamped() {
        let (x, y) = blobs(10, 2, 3.0, 4);
        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 3,
            max_features: Some(50),
            ..Default::default()
        });
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.predict_proba(&x).unwrap().len(), 20);
    }
}
