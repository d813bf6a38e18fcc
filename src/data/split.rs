//! Stratified resampling
//!
//! Both the initial train/test split and the v-fold cross-validation
//! folds are stratified by outcome so that the rare tsunami class keeps its
//! proportion in every partition.

use super::frame::Frame;
use crate::error::{Result, RiskError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Train/test split result
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Frame,
    pub test: Frame,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// One cross-validation fold, as row indices into the training frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    pub id: usize,
    pub analysis: Vec<usize>,
    pub assessment: Vec<usize>,
}

/// Stratified train/test split
///
/// Each class is shuffled independently and `round(prop * n_class)` of its
/// rows go to training.
pub fn initial_split(frame: &Frame, prop: f64, seed: u64) -> Result<Split> {
    if !(prop > 0.0 && prop < 1.0) {
        return Err(RiskError::InvalidParameter(format!(
            "split proportion must be in (0, 1), got {}",
            prop
        )));
    }
    let classes = non_degenerate_classes(frame)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for mut members in classes {
        members.shuffle(&mut rng);
        let n_train = (prop * members.len() as f64).round() as usize;
        let (train, test) = members.split_at(n_train.min(members.len()));
        train_indices.extend_from_slice(train);
        test_indices.extend_from_slice(test);
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(Split {
        train: frame.subset(&train_indices),
        test: frame.subset(&test_indices),
        train_indices,
        test_indices,
    })
}

/// Stratified v-fold cross-validation
///
/// Shuffled members of each class are dealt round-robin into `v` folds;
/// the deal continues across classes so fold sizes differ by at most one.
pub fn vfold_cv(frame: &Frame, v: usize, seed: u64) -> Result<Vec<Fold>> {
    if v < 2 {
        return Err(RiskError::InvalidParameter(format!(
            "number of folds must be >= 2, got {}",
            v
        )));
    }
    if frame.n_rows() < v {
        return Err(RiskError::InvalidParameter(format!(
            "{} folds requested for {} rows",
            v,
            frame.n_rows()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut assignment = vec![0usize; frame.n_rows()];
    let mut dealt = 0usize;

    for mut members in frame.class_indices() {
        members.shuffle(&mut rng);
        for idx in members {
            assignment[idx] = dealt % v;
            dealt += 1;
        }
    }

    Ok((0..v)
        .map(|id| {
            let (assessment, analysis): (Vec<usize>, Vec<usize>) =
                (0..frame.n_rows()).partition(|&i| assignment[i] == id);
            Fold {
                id,
                analysis,
                assessment,
            }
        })
        .collect())
}

fn non_degenerate_classes(frame: &Frame) -> Result<[Vec<usize>; 2]> {
    if frame.is_empty() {
        return Err(RiskError::EmptyData("cannot split an empty frame".to_string()));
    }
    let classes = frame.class_indices();
    if classes[0].is_empty() {
        return Err(RiskError::SingleClass(1.0));
    }
    if classes[1].is_empty() {
        return Err(RiskError::SingleClass(0.0));
    }
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n_neg: usize, n_pos: usize) -> Frame {
        let n = n_neg + n_pos;
        Frame {
            numeric_names: vec!["x".into()],
            numeric: vec![(0..n).map(|i| i as f64).collect()],
            nominal_names: vec![],
            nominal: vec![],
            outcome: (0..n).map(|i| if i < n_neg { 0.0 } else { 1.0 }).collect(),
        }
    }

    #[test]
    fn test_initial_split_is_stratified() {
        let data = frame(60, 40);
        let split = initial_split(&data, 0.75, 7).unwrap();

        assert_eq!(split.train.n_rows(), 75);
        assert_eq!(split.test.n_rows(), 25);
        assert_eq!(split.train.class_counts(), (45, 30));
        assert_eq!(split.test.class_counts(), (15, 10));

        for idx in &split.test_indices {
            assert!(!split.train_indices.contains(idx));
        }
    }

    #[test]
    fn test_initial_split_is_deterministic() {
        let data = frame(30, 20);
        let a = initial_split(&data, 0.8, 1).unwrap();
        let b = initial_split(&data, 0.8, 1).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
    }

    #[test]
    fn test_initial_split_rejects_bad_input() {
        assert!(initial_split(&frame(10, 10), 1.0, 1).is_err());
        assert!(matches!(
            initial_split(&frame(10, 0), 0.5, 1),
            Err(RiskError::SingleClass(_))
        ));
    }

    #[test]
    fn test_vfold_covers_every_row_once() {
        let data = frame(47, 23);
        let folds = vfold_cv(&data, 5, 3).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; data.n_rows()];
        for fold in &folds {
            assert_eq!(fold.analysis.len() + fold.assessment.len(), data.n_rows());
            assert!(fold.assessment.len() == 14);
            for &i in &fold.assessment {
                seen[i] += 1;
                assert!(!fold.analysis.contains(&i));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_vfold_keeps_class_balance() {
        let data = frame(50, 25);
        for fold in vfold_cv(&data, 5, 11).unwrap() {
            let positives = fold
                .assessment
                .iter()
                .filter(|&&i| data.outcome[i] > 0.5)
                .count();
            assert_eq!(positives, 5);
        }
    }

    #[test]
    fn test_vfold_rejects_single_fold() {
        assert!(vfold_cv(&frame(5, 5), 1, 0).is_err());
    }
}
