//! # netfit: feed-forward network estimator
//!
//! netfit wraps a configurable feed-forward neural network behind the
//! conventional estimator protocol (`fit`, `predict`, `predict_proba`,
//! `score`, plus get/set-style parameter access) so that hyperparameter
//! search and cross-validation tooling can drive it like any other model.
//!
//! ## Features
//!
//! - Configurable hidden stack: dense + activation or maxout units, with
//!   dropout, optional Gaussian input noise and a weight-norm constraint
//! - Staged training through a batch schedule of (epochs, batch size)
//!   pairs, with a full-dataset sentinel batch size
//! - Optional early stopping on a held-out validation split
//! - Classification (accuracy) and regression (R²) scoring
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use netfit::data::{synthetic, train_test_split, SplitConfig};
//! use netfit::estimator::adapter::ModelAdapter;
//! use netfit::estimator::{AdapterConfig, Estimator};
//!
//! // Synthetic linear relation y = 2x
//! let dataset = synthetic::linear(200, 2.0, 0.05, 42);
//! let (train, test) = train_test_split(&dataset, &SplitConfig::default());
//!
//! // Fit a regression estimator
//! let mut adapter: ModelAdapter = ModelAdapter::new(AdapterConfig::default(), "regression");
//! adapter.fit(&train.features, &train.targets).unwrap();
//!
//! // Score on held-out data
//! let r2 = adapter.score(&test.features, &test.targets).unwrap();
//! println!("R² = {:.4}", r2);
//! ```

pub mod cli;
pub mod data;
pub mod estimator;
pub mod model;
pub mod training;
pub mod utils;

use burn::backend::Autodiff;
use burn_ndarray::NdArray;

/// Default inference backend
pub type DefaultBackend = NdArray<f32>;

/// Default training backend
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Re-export commonly used types
pub use data::loader::TabularLoader;
pub use data::{FeatureMatrix, TabularDataset};
pub use estimator::adapter::ModelAdapter;
pub use estimator::{AdapterConfig, Estimator, ParamValue, TaskKind};
pub use training::BatchPhase;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!(
        "{} v{} - feed-forward neural network estimator",
        NAME, VERSION
    )
}
