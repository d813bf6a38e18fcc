//! Cleaned tabular data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column store of cleaned predictors and the binary outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Numeric predictor names
    pub numeric_names: Vec<String>,
    /// Numeric predictors, one vector per column
    pub numeric: Vec<Vec<f64>>,
    /// Nominal predictor names
    pub nominal_names: Vec<String>,
    /// Nominal predictors, one vector per column; `None` is missing
    pub nominal: Vec<Vec<Option<String>>>,
    /// Outcome (1.0 = tsunami, 0.0 = none)
    pub outcome: Vec<f64>,
}

impl Frame {
    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.outcome.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcome.is_empty()
    }

    /// Rows selected by index, in the given order
    pub fn subset(&self, indices: &[usize]) -> Frame {
        Frame {
            numeric_names: self.numeric_names.clone(),
            numeric: self
                .numeric
                .iter()
                .map(|col| indices.iter().map(|&i| col[i]).collect())
                .collect(),
            nominal_names: self.nominal_names.clone(),
            nominal: self
                .nominal
                .iter()
                .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
                .collect(),
            outcome: indices.iter().map(|&i| self.outcome[i]).collect(),
        }
    }

    /// Count of (negative, positive) outcomes
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.outcome.iter().filter(|&&y| y > 0.5).count();
        (self.n_rows() - positive, positive)
    }

    /// Row indices of each class, negatives first
    pub fn class_indices(&self) -> [Vec<usize>; 2] {
        let mut classes = [Vec::new(), Vec::new()];
        for (i, &y) in self.outcome.iter().enumerate() {
            classes[usize::from(y > 0.5)].push(i);
        }
        classes
    }

    pub fn numeric_column(&self, name: &str) -> Option<&[f64]> {
        self.numeric_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.numeric[i].as_slice())
    }

    pub fn nominal_column(&self, name: &str) -> Option<&[Option<String>]> {
        self.nominal_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.nominal[i].as_slice())
    }

    /// Level counts for a nominal column, missing values under `None`
    pub fn level_counts(&self, name: &str) -> BTreeMap<Option<String>, usize> {
        let mut counts = BTreeMap::new();
        if let Some(col) = self.nominal_column(name) {
            for value in col {
                *counts.entry(value.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Most frequent non-missing value; ties go to the lexicographically first level
pub fn column_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (level, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((level, count));
        }
    }
    best.map(|(level, _)| level.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        Frame {
            numeric_names: vec!["magnitude".into()],
            numeric: vec![vec![6.5, 7.0, 7.5, 8.0]],
            nominal_names: vec!["alert".into()],
            nominal: vec![vec![
                Some("green".into()),
                None,
                Some("red".into()),
                Some("green".into()),
            ]],
            outcome: vec![0.0, 0.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_subset_and_counts() {
        let frame = sample_frame();
        assert_eq!(frame.class_counts(), (2, 2));

        let sub = frame.subset(&[3, 0]);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.numeric[0], vec![8.0, 6.5]);
        assert_eq!(sub.outcome, vec![1.0, 0.0]);
        assert_eq!(sub.nominal[0][1].as_deref(), Some("green"));
    }

    #[test]
    fn test_column_mode_ties() {
        let values = vec![
            Some("yellow".to_string()),
            Some("green".to_string()),
            None,
            Some("yellow".to_string()),
            Some("green".to_string()),
        ];
        assert_eq!(column_mode(&values).as_deref(), Some("green"));
        assert_eq!(column_mode(&[None, None]), None);
    }

    #[test]
    fn test_level_counts() {
        let frame = sample_frame();
        let counts = frame.level_counts("alert");
        assert_eq!(counts[&Some("green".to_string())], 2);
        assert_eq!(counts[&None], 1);
    }
}
