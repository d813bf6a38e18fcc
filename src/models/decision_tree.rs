//! Decision Tree implementation
//!
//! Binary CART trees over a dense feature matrix. Splits are found by sorting
//! each candidate feature once and sweeping prefix sums, which scores every
//! threshold in O(n) after the sort.
//!
//! Both tasks share one criterion: the split gain is
//! `G_L^2 / (H_L + l2) + G_R^2 / (H_R + l2) - G^2 / (H + l2)`, where `G` sums
//! the targets and `H` sums the sample weights. With unit weights and no l2
//! this is the reduction in squared error, which for 0/1 labels is
//! proportional to the Gini decrease. Boosting passes Hessians as weights to
//! get Newton leaves.

use super::{check_columns, check_training_data, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Classification trees require 0/1 targets and clamp predictions
    pub task: TaskType,
    /// L2 penalty on leaf values, only applied with Hessian weights
    pub leaf_l2: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskType {
    Regression,
    Classification,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
            task: TaskType::Classification,
            leaf_l2: 1.0,
        }
    }
}

/// Internal split of a tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSplit {
    pub feature_idx: usize,
    /// Samples with `x <= threshold` go left
    pub threshold: f64,
    pub left: Box<TreeNode>,
    pub right: Box<TreeNode>,
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Leaf prediction; P(tsunami) for classification trees
    pub value: f64,
    /// Number of samples in this node
    pub n_samples: usize,
    pub split: Option<NodeSplit>,
}

impl TreeNode {
    fn leaf(value: f64, n_samples: usize) -> Self {
        Self {
            value,
            n_samples,
            split: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }

    pub fn depth(&self) -> usize {
        match &self.split {
            None => 1,
            Some(s) => 1 + s.left.depth().max(s.right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match &self.split {
            None => 1,
            Some(s) => s.left.n_leaves() + s.right.n_leaves(),
        }
    }
}

/// Targets and weights seen by the split search
struct Targets<'a> {
    y: &'a Array1<f64>,
    hessians: Option<&'a Array1<f64>>,
    l2: f64,
}

impl Targets<'_> {
    fn weight(&self, i: usize) -> f64 {
        self.hessians.map_or(1.0, |h| h[i])
    }

    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices
            .iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.y[i], h + self.weight(i)))
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.l2;
        if denom <= 0.0 {
            0.0
        } else {
            g * g / denom
        }
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.l2;
        if denom <= 0.0 {
            0.0
        } else {
            g / denom
        }
    }
}

/// Decision Tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Create a new decision tree with config
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn default_classification() -> Self {
        Self::new(TreeConfig::default())
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Train on a subset of rows
    ///
    /// `indices` may repeat rows, as in a bootstrap sample. When `hessians`
    /// is given, `y` holds gradients and leaves take a Newton step.
    pub fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        hessians: Option<&Array1<f64>>,
    ) -> Result<()> {
        check_training_data(x, y)?;
        if indices.is_empty() {
            return Err(RiskError::EmptyData("no rows to grow a tree on".to_string()));
        }
        if self.config.task == TaskType::Classification {
            if hessians.is_some() {
                return Err(RiskError::InvalidParameter(
                    "Hessian weights need a regression tree".to_string(),
                ));
            }
            if let Some(&bad) = indices.iter().map(|&i| &y[i]).find(|&&v| v != 0.0 && v != 1.0) {
                return Err(RiskError::InvalidParameter(format!(
                    "classification tree target must be 0 or 1, got {}",
                    bad
                )));
            }
        }
        if let Some(h) = hessians {
            if h.len() != y.len() {
                return Err(RiskError::DimensionMismatch {
                    expected: y.len(),
                    got: h.len(),
                });
            }
        }

        self.n_features = x.ncols();
        self.feature_importances = vec![0.0; self.n_features];

        let targets = Targets {
            y,
            hessians,
            l2: if hessians.is_some() { self.config.leaf_l2 } else { 0.0 },
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let root = self.build_tree(x, &targets, indices.to_vec(), 0, &mut rng);
        self.root = Some(root);

        // Normalize feature importances
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
        Ok(())
    }

    /// Build tree recursively
    fn build_tree(
        &mut self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let (g, h) = targets.sums(&indices);
        let value = targets.leaf_value(g, h);

        let mean = g / n as f64;
        let spread: f64 = indices.iter().map(|&i| (targets.y[i] - mean).powi(2)).sum();

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf.max(1)
            || spread < 1e-12
        {
            return TreeNode::leaf(value, n);
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, targets, &indices, (g, h), rng) else {
            return TreeNode::leaf(value, n);
        };

        self.feature_importances[feature_idx] += gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, feature_idx]] <= threshold);

        let left = self.build_tree(x, targets, left_idx, depth + 1, rng);
        let right = self.build_tree(x, targets, right_idx, depth + 1, rng);

        TreeNode {
            value,
            n_samples: n,
            split: Some(NodeSplit {
                feature_idx,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }),
        }
    }

    /// Find the best split as `(feature, threshold, gain)`
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        (g_total, h_total): (f64, f64),
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let max_features = self
            .config
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features.max(1));
        let min_leaf = self.config.min_samples_leaf.max(1);

        // Select features to consider
        let mut feature_indices: Vec<usize> = (0..self.n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let parent_score = targets.score(g_total, h_total);
        let mut best_gain = 1e-12;
        let mut best: Option<(usize, f64, f64)> = None;

        for &feature_idx in &feature_indices {
            let mut order: Vec<(f64, usize)> = indices.iter().map(|&i| (x[[i, feature_idx]], i)).collect();
            order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for k in 0..n - 1 {
                let (value, i) = order[k];
                g_left += targets.y[i];
                h_left += targets.weight(i);

                let next = order[k + 1].0;
                if value == next {
                    continue;
                }
                let n_left = k + 1;
                if n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }

                let gain = targets.score(g_left, h_left)
                    + targets.score(g_total - g_left, h_total - h_left)
                    - parent_score;
                if gain > best_gain {
                    best_gain = gain;
                    let mid = (value + next) / 2.0;
                    let threshold = if mid < next { mid } else { value };
                    best = Some((feature_idx, threshold, gain));
                }
            }
        }

        best
    }

    /// Raw leaf value for one row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(RiskError::NotFitted)?;
        while let Some(split) = &node.split {
            node = if row[split.feature_idx] <= split.threshold {
                &*split.left
            } else {
                &*split.right
            };
        }
        Ok(node.value)
    }

    /// Raw leaf values for every row
    pub fn predict_values(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.root.is_none() {
            return Err(RiskError::NotFitted);
        }
        check_columns(self.n_features, x)?;
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.depth())
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.n_leaves())
    }

    /// Impurity importances, normalized to sum to one when any split exists
    pub fn importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, y, &indices, None)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let values = self.predict_values(x)?;
        Ok(match self.config.task {
            TaskType::Classification => values.mapv(|p| p.clamp(0.0, 1.0)),
            TaskType::Regression => values,
        })
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.feature_importances.clone())
    }
}
