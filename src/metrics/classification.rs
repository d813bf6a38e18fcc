//! Classification metrics for evaluating tsunami classifiers

use super::roc::roc_auc;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True positives
    pub tp: usize,
    /// True negatives
    pub tn: usize,
    /// False positives
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Calculate confusion matrix from predictions
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut cm = Self::default();

        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }

        cm
    }

    /// Total samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Print formatted confusion matrix
    pub fn display(&self) -> String {
        format!(
            "               Truth\n\
             Prediction     0       1\n\
             \x20        0 {:>5}   {:>5}\n\
             \x20        1 {:>5}   {:>5}\n",
            self.tn, self.fn_, self.fp, self.tp
        )
    }
}

/// Collection of classification metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    /// Sensitivity
    pub recall: f64,
    pub specificity: f64,
    pub f1: f64,
    /// Matthews correlation coefficient
    pub mcc: f64,
    pub auc_roc: Option<f64>,
    pub log_loss: Option<f64>,
}

impl ClassificationMetrics {
    /// Calculate all metrics from hard predictions
    pub fn calculate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        Self::calculate_with_proba(y_true, y_pred, None)
    }

    /// Calculate metrics with probability predictions for AUC and log loss
    pub fn calculate_with_proba(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_proba: Option<&Array1<f64>>,
    ) -> Self {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);

        let precision = ratio(cm.tp, cm.tp + cm.fp);
        let recall = ratio(cm.tp, cm.tp + cm.fn_);
        let f1 = if precision + recall < 1e-10 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            confusion_matrix: cm,
            accuracy: ratio(cm.tp + cm.tn, cm.total()),
            precision,
            recall,
            specificity: ratio(cm.tn, cm.tn + cm.fp),
            f1,
            mcc: mcc(&cm),
            auc_roc: y_proba.and_then(|p| roc_auc(y_true, p)),
            log_loss: y_proba.map(|p| log_loss(y_true, p)),
        }
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        let mut s = String::new();
        s.push_str(&self.confusion_matrix.display());
        s.push_str(&format!("  Accuracy:    {:.4}\n", self.accuracy));
        s.push_str(&format!("  Precision:   {:.4}\n", self.precision));
        s.push_str(&format!("  Sensitivity: {:.4}\n", self.recall));
        s.push_str(&format!("  Specificity: {:.4}\n", self.specificity));
        s.push_str(&format!("  F1 Score:    {:.4}\n", self.f1));
        s.push_str(&format!("  MCC:         {:.4}\n", self.mcc));

        if let Some(auc) = self.auc_roc {
            s.push_str(&format!("  ROC AUC:     {:.4}\n", auc));
        }
        if let Some(ll) = self.log_loss {
            s.push_str(&format!("  Log Loss:    {:.4}\n", ll));
        }

        s
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn mcc(cm: &ConfusionMatrix) -> f64 {
    let tp = cm.tp as f64;
    let tn = cm.tn as f64;
    let fp = cm.fp as f64;
    let fn_ = cm.fn_ as f64;

    let denom = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    (tp * tn - fp * fn_) / denom
}

/// Binary cross-entropy
pub fn log_loss(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> f64 {
    let eps = 1e-15;
    let n = y_true.len().max(1) as f64;

    -y_true
        .iter()
        .zip(y_proba.iter())
        .map(|(&t, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            t * p.ln() + (1.0 - t) * (1.0 - p).ln()
        })
        .sum::<f64>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_confusion_matrix() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred);

        assert_eq!(cm.tp, 2);
        assert_eq!(cm.tn, 2);
        assert_eq!(cm.fp, 1);
        assert_eq!(cm.fn_, 1);
        assert_eq!(cm.total(), 6);
    }

    #[test]
    fn test_metrics() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0];
        let proba = array![0.9, 0.8, 0.4, 0.6, 0.1];

        let m = ClassificationMetrics::calculate_with_proba(&y_true, &y_pred, Some(&proba));

        assert!((m.accuracy - 0.6).abs() < 1e-10);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-10);
        assert!((m.specificity - 0.5).abs() < 1e-10);
        assert!(m.auc_roc.unwrap() > 0.8);
        assert!(m.log_loss.unwrap() > 0.0);
    }

    #[test]
    fn test_degenerate_predictions() {
        let y_true = array![0.0, 0.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0];

        let m = ClassificationMetrics::calculate(&y_true, &y_pred);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.mcc, 0.0);
        assert!(m.auc_roc.is_none());
    }
}
