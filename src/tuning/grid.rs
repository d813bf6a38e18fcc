//! Hyperparameter grids
//!
//! Each tuned model has a list of values per parameter; the candidates are
//! the Cartesian product in declaration order.

use crate::models::{Hyperparameters, ModelKind, WeightFunc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticGrid {
    pub penalty: Vec<f64>,
    pub mixture: Vec<f64>,
}

impl Default for LogisticGrid {
    fn default() -> Self {
        Self {
            penalty: vec![1e-4, 1e-3, 1e-2, 1e-1, 1.0],
            mixture: vec![0.0, 0.5, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnGrid {
    pub neighbors: Vec<usize>,
    pub weight_func: Vec<WeightFunc>,
}

impl Default for KnnGrid {
    fn default() -> Self {
        Self {
            neighbors: vec![3, 5, 7, 9, 11, 15, 21],
            weight_func: vec![WeightFunc::Rectangular, WeightFunc::Inverse],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub mtry: Vec<usize>,
    pub min_n: Vec<usize>,
    pub trees: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            mtry: vec![2, 4, 6, 8],
            min_n: vec![2, 5, 10],
            trees: vec![100],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostGrid {
    pub trees: Vec<usize>,
    pub tree_depth: Vec<usize>,
    pub learn_rate: Vec<f64>,
}

impl Default for BoostGrid {
    fn default() -> Self {
        Self {
            trees: vec![50, 100, 200],
            tree_depth: vec![2, 3, 4],
            learn_rate: vec![0.05, 0.1, 0.3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmLinearGrid {
    pub cost: Vec<f64>,
}

impl Default for SvmLinearGrid {
    fn default() -> Self {
        Self {
            cost: vec![0.01, 0.1, 1.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmRbfGrid {
    pub cost: Vec<f64>,
    pub rbf_sigma: Vec<f64>,
}

impl Default for SvmRbfGrid {
    fn default() -> Self {
        Self {
            cost: vec![0.1, 1.0, 10.0],
            rbf_sigma: vec![0.01, 0.1, 1.0],
        }
    }
}

/// Search space for every tuned model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub logistic: LogisticGrid,
    pub knn: KnnGrid,
    pub random_forest: ForestGrid,
    pub boosted_trees: BoostGrid,
    pub svm_linear: SvmLinearGrid,
    pub svm_rbf: SvmRbfGrid,
}

impl ParamGrid {
    /// All candidates for one model, in grid order
    pub fn candidates(&self, kind: ModelKind) -> Vec<Hyperparameters> {
        let mut out = Vec::new();
        match kind {
            ModelKind::Logistic => {
                for &penalty in &self.logistic.penalty {
                    for &mixture in &self.logistic.mixture {
                        out.push(Hyperparameters::Logistic { penalty, mixture });
                    }
                }
            }
            ModelKind::Lda => out.push(Hyperparameters::Lda),
            ModelKind::Knn => {
                for &neighbors in &self.knn.neighbors {
                    for &weight_func in &self.knn.weight_func {
                        out.push(Hyperparameters::Knn {
                            neighbors,
                            weight_func,
                        });
                    }
                }
            }
            ModelKind::RandomForest => {
                for &mtry in &self.random_forest.mtry {
                    for &min_n in &self.random_forest.min_n {
                        for &trees in &self.random_forest.trees {
                            out.push(Hyperparameters::RandomForest { mtry, min_n, trees });
                        }
                    }
                }
            }
            ModelKind::BoostedTrees => {
                for &trees in &self.boosted_trees.trees {
                    for &tree_depth in &self.boosted_trees.tree_depth {
                        for &learn_rate in &self.boosted_trees.learn_rate {
                            out.push(Hyperparameters::BoostedTrees {
                                trees,
                                tree_depth,
                                learn_rate,
                            });
                        }
                    }
                }
            }
            ModelKind::SvmLinear => {
                for &cost in &self.svm_linear.cost {
                    out.push(Hyperparameters::SvmLinear { cost });
                }
            }
            ModelKind::SvmRbf => {
                for &cost in &self.svm_rbf.cost {
                    for &rbf_sigma in &self.svm_rbf.rbf_sigma {
                        out.push(Hyperparameters::SvmRbf { cost, rbf_sigma });
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_sizes() {
        let grid = ParamGrid::default();
        assert_eq!(grid.candidates(ModelKind::Logistic).len(), 15);
        assert_eq!(grid.candidates(ModelKind::Lda), vec![Hyperparameters::Lda]);
        assert_eq!(grid.candidates(ModelKind::Knn).len(), 14);
        assert_eq!(grid.candidates(ModelKind::RandomForest).len(), 12);
        assert_eq!(grid.candidates(ModelKind::BoostedTrees).len(), 27);
        assert_eq!(grid.candidates(ModelKind::SvmLinear).len(), 4);
        assert_eq!(grid.candidates(ModelKind::SvmRbf).len(), 9);
    }

    #[test]
    fn test_grid_order_is_row_major() {
        let grid = ParamGrid {
            svm_rbf: SvmRbfGrid {
                cost: vec![1.0, 2.0],
                rbf_sigma: vec![0.1, 0.2],
            },
            ..Default::default()
        };
        let c = grid.candidates(ModelKind::SvmRbf);
        assert_eq!(c[0], Hyperparameters::SvmRbf { cost: 1.0, rbf_sigma: 0.1 });
        assert_eq!(c[1], Hyperparameters::SvmRbf { cost: 1.0, rbf_sigma: 0.2 });
        assert_eq!(c[3], Hyperparameters::SvmRbf { cost: 2.0, rbf_sigma: 0.2 });
    }

    #[test]
    fn test_grid_from_toml() {
        let grid: ParamGrid = toml::from_str(
            "[knn]\nneighbors = [1, 3]\nweight_func = [\"triangular\"]\n",
        )
        .unwrap();
        assert_eq!(grid.candidates(ModelKind::Knn).len(), 2);
        assert_eq!(grid.logistic, LogisticGrid::default());
    }
}
