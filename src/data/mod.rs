//! Data loading, cleaning and resampling
//!
//! - `loader` - CSV input into a raw string table
//! - `cleaning` - feature selection, outcome parsing, mode imputation
//! - `frame` - the cleaned column store shared by every later stage
//! - `split` - stratified train/test split and v-fold cross-validation

pub mod cleaning;
pub mod frame;
pub mod loader;
pub mod split;

pub use cleaning::Cleaner;
pub use frame::{column_mode, Frame};
pub use loader::{DataLoader, RawTable};
pub use split::{initial_split, vfold_cv, Fold, Split};
