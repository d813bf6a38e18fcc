//! ROC curve and AUC
//!
//! The positive class is tsunami (1.0). Samples with tied scores are
//! processed together, so a run of ties contributes one diagonal segment.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One point of a ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Samples scoring at or above this value are predicted positive
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

/// Receiver operating characteristic curve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Compute the curve from labels and scores
    ///
    /// Returns an empty curve when either class is absent.
    pub fn compute(y_true: &Array1<f64>, scores: &Array1<f64>) -> Self {
        let mut pairs: Vec<(f64, bool)> = scores
            .iter()
            .zip(y_true.iter())
            .map(|(&s, &t)| (s, t >= 0.5))
            .collect();

        let n_pos = pairs.iter().filter(|(_, t)| *t).count() as f64;
        let n_neg = pairs.len() as f64 - n_pos;
        if n_pos == 0.0 || n_neg == 0.0 {
            return Self::default();
        }

        // Sort by score descending
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut points = vec![RocPoint {
            threshold: f64::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        }];

        let mut tp = 0.0;
        let mut fp = 0.0;
        let mut i = 0;
        while i < pairs.len() {
            let score = pairs[i].0;
            while i < pairs.len() && (pairs[i].0 == score || pairs[i].0.total_cmp(&score).is_eq()) {
                if pairs[i].1 {
                    tp += 1.0;
                } else {
                    fp += 1.0;
                }
                i += 1;
            }
            points.push(RocPoint {
                threshold: score,
                fpr: fp / n_neg,
                tpr: tp / n_pos,
            });
        }

        Self { points }
    }

    /// Trapezoidal area under the curve
    pub fn auc(&self) -> Option<f64> {
        if self.points.len() < 2 {
            return None;
        }
        Some(
            self.points
                .windows(2)
                .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
                .sum(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Area under the ROC curve
///
/// `None` when only one class is present or a score is not finite.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
    if scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    RocCurve::compute(y_true, scores).auc()
}
