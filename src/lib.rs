//! # Tsunami Risk - classifying earthquakes by tsunami potential
//!
//! A complete modelling workflow over an earthquake catalogue:
//!
//! - CSV loading, feature selection and mode imputation of alert levels
//! - Exploratory summaries and correlations
//! - Stratified train/test split and v-fold cross-validation
//! - A shared preprocessing recipe (imputation, dummies, zero-variance
//!   filter, normalization)
//! - Seven classifiers tuned by grid search on ROC AUC
//! - Final test-set evaluation with ROC curves and confusion matrices

pub mod config;
pub mod data;
pub mod error;
pub mod explore;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod recipe;
pub mod report;
pub mod tuning;
pub mod workflow;

pub use config::Config;
pub use data::{Cleaner, DataLoader, Frame};
pub use error::{Result, RiskError};
pub use explore::ExploreSummary;
pub use metrics::{ClassificationMetrics, ConfusionMatrix, RocCurve};
pub use models::{Classifier, Hyperparameters, ModelKind};
pub use pipeline::Pipeline;
pub use recipe::Recipe;
pub use report::Report;
pub use tuning::{GridSearch, ParamGrid, TuneResults};
pub use workflow::{last_fit, ModelEvaluation, Workflow};

/// Common imports for pipeline code
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::data::{initial_split, vfold_cv, Cleaner, DataLoader, Fold, Frame, Split};
    pub use crate::error::{Result, RiskError};
    pub use crate::explore::ExploreSummary;
    pub use crate::metrics::{roc_auc, ClassificationMetrics, ConfusionMatrix, RocCurve};
    pub use crate::models::{Classifier, Hyperparameters, ModelKind, WeightFunc};
    pub use crate::pipeline::Pipeline;
    pub use crate::recipe::Recipe;
    pub use crate::report::Report;
    pub use crate::tuning::{GridSearch, ParamGrid, TuneCache, TuneResults};
    pub use crate::workflow::{last_fit, ModelEvaluation, Workflow};
}
