//! Hyperparameter tuning
//!
//! - `grid` - per-model value lists and their Cartesian product
//! - `search` - cross-validated grid search scored by ROC AUC
//! - `cache` - JSON persistence of search results

pub mod cache;
pub mod grid;
pub mod search;

pub use cache::TuneCache;
pub use grid::{BoostGrid, ForestGrid, KnnGrid, LogisticGrid, ParamGrid, SvmLinearGrid, SvmRbfGrid};
pub use search::{CandidateResult, GridSearch, TuneResults};
