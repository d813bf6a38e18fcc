//! Shared preprocessing recipe
//!
//! A [`Recipe`] is estimated on training rows with [`Recipe::prep`] and the
//! resulting [`PreparedRecipe`] is replayed on any frame with the same
//! schema via [`PreparedRecipe::bake`]. Steps run in a fixed order:
//!
//! 1. impute nominal missing values with the training mode
//! 2. dummy-encode nominal columns (first sorted level is the reference)
//! 3. drop zero-variance predictors
//! 4. centre and scale by the training mean and sample standard deviation

use crate::data::{column_mode, Frame};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Model-ready matrices produced by baking a frame
#[derive(Debug, Clone)]
pub struct Design {
    /// Feature matrix (n_samples x n_features)
    pub x: Array2<f64>,
    /// Outcome vector (0/1)
    pub y: Array1<f64>,
    /// Column names of `x`
    pub feature_names: Vec<String>,
}

impl Design {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Preprocessing steps to estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Recipe {
    pub impute_mode: bool,
    pub dummy: bool,
    pub zero_variance: bool,
    pub normalize: bool,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            impute_mode: true,
            dummy: true,
            zero_variance: true,
            normalize: true,
        }
    }
}

impl Recipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate every step on the given training frame
    pub fn prep(&self, frame: &Frame) -> Result<PreparedRecipe> {
        if frame.is_empty() {
            return Err(RiskError::EmptyData("cannot prep a recipe on zero rows".to_string()));
        }

        let modes: Vec<Option<String>> = if self.impute_mode {
            frame.nominal.iter().map(|col| column_mode(col)).collect()
        } else {
            vec![None; frame.nominal.len()]
        };

        let levels: Vec<Vec<String>> = if self.dummy {
            frame
                .nominal
                .iter()
                .zip(&modes)
                .map(|(col, mode)| {
                    let set: BTreeSet<String> = col
                        .iter()
                        .filter_map(|v| v.clone().or_else(|| mode.clone()))
                        .collect();
                    set.into_iter().collect()
                })
                .collect()
        } else {
            vec![Vec::new(); frame.nominal.len()]
        };

        let mut prepared = PreparedRecipe {
            numeric_names: frame.numeric_names.clone(),
            nominal_names: frame.nominal_names.clone(),
            modes,
            levels,
            keep: Vec::new(),
            feature_names: Vec::new(),
            means: Array1::zeros(0),
            stds: Array1::zeros(0),
        };

        let expanded_names = prepared.expanded_names();
        let expanded = prepared.expand(frame);

        prepared.keep = if self.zero_variance && expanded.nrows() > 1 {
            let stds = expanded.std_axis(Axis(0), 1.0);
            (0..expanded.ncols()).filter(|&j| stds[j] > 1e-12).collect()
        } else {
            (0..expanded.ncols()).collect()
        };

        let dropped = expanded.ncols() - prepared.keep.len();
        if dropped > 0 {
            debug!("Zero-variance filter removed {} predictors", dropped);
        }

        prepared.feature_names = prepared
            .keep
            .iter()
            .map(|&j| expanded_names[j].clone())
            .collect();

        let kept = expanded.select(Axis(1), &prepared.keep);
        let n_kept = kept.ncols();
        if self.normalize && kept.nrows() > 1 {
            prepared.means = kept
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(n_kept));
            prepared.stds = kept.std_axis(Axis(0), 1.0);
        } else {
            prepared.means = Array1::zeros(n_kept);
            prepared.stds = Array1::ones(n_kept);
        }

        Ok(prepared)
    }
}

/// A recipe whose statistics have been estimated on training data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedRecipe {
    numeric_names: Vec<String>,
    nominal_names: Vec<String>,
    modes: Vec<Option<String>>,
    levels: Vec<Vec<String>>,
    keep: Vec<usize>,
    feature_names: Vec<String>,
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl PreparedRecipe {
    /// Names of the columns produced by `bake`
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Apply the estimated steps to a frame
    pub fn bake(&self, frame: &Frame) -> Result<Design> {
        for name in &self.numeric_names {
            if !frame.numeric_names.contains(name) {
                return Err(RiskError::MissingColumn(name.clone()));
            }
        }
        for name in &self.nominal_names {
            if !frame.nominal_names.contains(name) {
                return Err(RiskError::MissingColumn(name.clone()));
            }
        }

        let expanded = self.expand(frame);
        let mut x = expanded.select(Axis(1), &self.keep);

        for (j, mut col) in x.columns_mut().into_iter().enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            col.mapv_inplace(|v| if std > 1e-12 { (v - mean) / std } else { v - mean });
        }

        Ok(Design {
            x,
            y: Array1::from_vec(frame.outcome.clone()),
            feature_names: self.feature_names.clone(),
        })
    }

    /// Numeric columns followed by dummy indicators, before filtering
    fn expanded_names(&self) -> Vec<String> {
        let mut names = self.numeric_names.clone();
        for (name, levels) in self.nominal_names.iter().zip(&self.levels) {
            for level in levels.iter().skip(1) {
                names.push(format!("{}_{}", name, level));
            }
        }
        names
    }

    fn expand(&self, frame: &Frame) -> Array2<f64> {
        let n = frame.n_rows();
        let n_dummies: usize = self.levels.iter().map(|l| l.len().saturating_sub(1)).sum();
        let mut x = Array2::<f64>::zeros((n, self.numeric_names.len() + n_dummies));

        for (j, name) in self.numeric_names.iter().enumerate() {
            if let Some(col) = frame.numeric_column(name) {
                for (i, &v) in col.iter().enumerate() {
                    x[[i, j]] = v;
                }
            }
        }

        let mut offset = self.numeric_names.len();
        for ((name, levels), mode) in self.nominal_names.iter().zip(&self.levels).zip(&self.modes) {
            if levels.len() < 2 {
                continue;
            }
            let mut unseen = 0usize;
            if let Some(col) = frame.nominal_column(name) {
                for (i, value) in col.iter().enumerate() {
                    let value = value.as_ref().or(mode.as_ref());
                    match value.and_then(|v| levels.iter().position(|l| l == v)) {
                        Some(0) => {}
                        Some(k) => x[[i, offset + k - 1]] = 1.0,
                        None => unseen += 1,
                    }
                }
            }
            if unseen > 0 {
                warn!("{} rows of {} have a level unseen in training", unseen, name);
            }
            offset += levels.len() - 1;
        }

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_frame() -> Frame {
        Frame {
            numeric_names: vec!["magnitude".into(), "constant".into()],
            numeric: vec![vec![6.0, 7.0, 8.0, 9.0], vec![1.0, 1.0, 1.0, 1.0]],
            nominal_names: vec!["alert".into()],
            nominal: vec![vec![
                Some("green".into()),
                Some("yellow".into()),
                None,
                Some("green".into()),
            ]],
            outcome: vec![0.0, 0.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_prep_and_bake_training() {
        let frame = training_frame();
        let prepared = Recipe::new().prep(&frame).unwrap();
        let design = prepared.bake(&frame).unwrap();

        // "constant" is dropped, "alert_yellow" is the only dummy
        assert_eq!(design.feature_names, vec!["magnitude", "alert_yellow"]);
        assert_eq!(design.x.dim(), (4, 2));

        let means = design.x.mean_axis(Axis(0)).unwrap();
        let stds = design.x.std_axis(Axis(0), 1.0);
        for j in 0..2 {
            assert!(means[j].abs() < 1e-10);
            assert!((stds[j] - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_missing_level_uses_training_mode() {
        let frame = training_frame();
        let prepared = Recipe {
            normalize: false,
            ..Recipe::default()
        }
        .prep(&frame)
        .unwrap();
        let design = prepared.bake(&frame).unwrap();

        // Row 2 was missing and takes the mode "green" (reference level)
        assert_eq!(design.x[[2, 1]], 0.0);
        assert_eq!(design.x[[1, 1]], 1.0);
    }

    #[test]
    fn test_unseen_level_bakes_to_reference() {
        let frame = training_frame();
        let prepared = Recipe {
            normalize: false,
            ..Recipe::default()
        }
        .prep(&frame)
        .unwrap();

        let mut test = frame.subset(&[0]);
        test.nominal[0][0] = Some("red".into());
        let design = prepared.bake(&test).unwrap();
        assert_eq!(design.x[[0, 1]], 0.0);
        assert_eq!(design.x[[0, 0]], 6.0);
    }

    #[test]
    fn test_bake_requires_schema() {
        let frame = training_frame();
        let prepared = Recipe::new().prep(&frame).unwrap();

        let mut other = frame.clone();
        other.numeric_names[0] = "depth".into();
        assert!(matches!(
            prepared.bake(&other),
            Err(RiskError::MissingColumn(name)) if name == "magnitude"
        ));
    }
}
