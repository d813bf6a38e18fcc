//! Model kinds and their hyperparameters

use super::boosted::{BoostConfig, GradientBoosting};
use super::knn::{KNNClassifier, WeightFunc};
use super::lda::LinearDiscriminant;
use super::logistic::LogisticRegression;
use super::random_forest::{ForestConfig, RandomForest};
use super::svm::{Kernel, SupportVectorMachine};
use super::Classifier;
use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven compared model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Logistic,
    Lda,
    Knn,
    RandomForest,
    BoostedTrees,
    SvmLinear,
    SvmRbf,
}

impl ModelKind {
    pub const ALL: [ModelKind; 7] = [
        ModelKind::Logistic,
        ModelKind::Lda,
        ModelKind::Knn,
        ModelKind::RandomForest,
        ModelKind::BoostedTrees,
        ModelKind::SvmLinear,
        ModelKind::SvmRbf,
    ];

    /// Identifier used on the command line and in file names
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::Lda => "lda",
            ModelKind::Knn => "knn",
            ModelKind::RandomForest => "random_forest",
            ModelKind::BoostedTrees => "boosted_trees",
            ModelKind::SvmLinear => "svm_linear",
            ModelKind::SvmRbf => "svm_rbf",
        }
    }

    /// Human-readable label for reports
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "Logistic regression",
            ModelKind::Lda => "Linear discriminant analysis",
            ModelKind::Knn => "K-nearest neighbors",
            ModelKind::RandomForest => "Random forest",
            ModelKind::BoostedTrees => "Boosted trees",
            ModelKind::SvmLinear => "Linear SVM",
            ModelKind::SvmRbf => "RBF SVM",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ModelKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == normalized)
            .or(match normalized.as_str() {
                "logreg" | "glm" => Some(ModelKind::Logistic),
                "rf" => Some(ModelKind::RandomForest),
                "xgboost" | "boost" | "gbm" => Some(ModelKind::BoostedTrees),
                _ => None,
            })
            .ok_or_else(|| RiskError::InvalidParameter(format!("unknown model: {}", s)))
    }
}

/// One fully specified model configuration (a grid candidate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Hyperparameters {
    Logistic { penalty: f64, mixture: f64 },
    Lda,
    Knn { neighbors: usize, weight_func: WeightFunc },
    RandomForest { mtry: usize, min_n: usize, trees: usize },
    BoostedTrees { trees: usize, tree_depth: usize, learn_rate: f64 },
    SvmLinear { cost: f64 },
    SvmRbf { cost: f64, rbf_sigma: f64 },
}

impl Hyperparameters {
    pub fn kind(&self) -> ModelKind {
        match self {
            Hyperparameters::Logistic { .. } => ModelKind::Logistic,
            Hyperparameters::Lda => ModelKind::Lda,
            Hyperparameters::Knn { .. } => ModelKind::Knn,
            Hyperparameters::RandomForest { .. } => ModelKind::RandomForest,
            Hyperparameters::BoostedTrees { .. } => ModelKind::BoostedTrees,
            Hyperparameters::SvmLinear { .. } => ModelKind::SvmLinear,
            Hyperparameters::SvmRbf { .. } => ModelKind::SvmRbf,
        }
    }

    /// Build an unfitted classifier with these settings
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match *self {
            Hyperparameters::Logistic { penalty, mixture } => {
                Box::new(LogisticRegression::elastic_net(penalty, mixture))
            }
            Hyperparameters::Lda => Box::new(LinearDiscriminant::new()),
            Hyperparameters::Knn {
                neighbors,
                weight_func,
            } => Box::new(KNNClassifier::new(neighbors).with_weights(weight_func)),
            Hyperparameters::RandomForest { mtry, min_n, trees } => {
                Box::new(RandomForest::new(ForestConfig {
                    n_trees: trees,
                    max_features: Some(mtry),
                    min_samples_split: min_n,
                    seed,
                    ..Default::default()
                }))
            }
            Hyperparameters::BoostedTrees {
                trees,
                tree_depth,
                learn_rate,
            } => Box::new(GradientBoosting::new(BoostConfig {
                n_trees: trees,
                max_depth: tree_depth,
                learning_rate: learn_rate,
                seed,
                ..Default::default()
            })),
            Hyperparameters::SvmLinear { cost } => {
                Box::new(SupportVectorMachine::new(Kernel::Linear, cost).with_seed(seed))
            }
            Hyperparameters::SvmRbf { cost, rbf_sigma } => Box::new(
                SupportVectorMachine::new(Kernel::Rbf { sigma: rbf_sigma }, cost).with_seed(seed),
            ),
        }
    }

    /// Compact `name=value` rendering for tables
    pub fn describe(&self) -> String {
        match self {
            Hyperparameters::Logistic { penalty, mixture } => {
                format!("penalty={:.4}, mixture={:.2}", penalty, mixture)
            }
            Hyperparameters::Lda => "-".to_string(),
            Hyperparameters::Knn {
                neighbors,
                weight_func,
            } => format!("neighbors={}, weight_func={}", neighbors, weight_func),
            Hyperparameters::RandomForest { mtry, min_n, trees } => {
                format!("mtry={}, min_n={}, trees={}", mtry, min_n, trees)
            }
            Hyperparameters::BoostedTrees {
                trees,
                tree_depth,
                learn_rate,
            } => format!(
                "trees={}, tree_depth={}, learn_rate={:.3}",
                trees, tree_depth, learn_rate
            ),
            Hyperparameters::SvmLinear { cost } => format!("cost={:.4}", cost),
            Hyperparameters::SvmRbf { cost, rbf_sigma } => {
                format!("cost={:.4}, rbf_sigma={:.4}", cost, rbf_sigma)
            }
        }
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.describe())
    }
}
