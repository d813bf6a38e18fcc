//! Model evaluation metrics
//!
//! - `roc` - ROC curve points and area under the curve
//! - `classification` - confusion matrix and threshold metrics

pub mod classification;
pub mod roc;

pub use classification::{ClassificationMetrics, ConfusionMatrix};
pub use roc::{roc_auc, RocCurve, RocPoint};
