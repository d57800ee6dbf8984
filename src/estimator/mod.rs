pub mod adapter;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::FeatureMatrix;
use crate::model::Activation;
use crate::training::BatchPhase;

/// Task-type tags resolved to classification
const CLASSIFIER_TAGS: &[&str] = &["classifier", "classification", "classify"];

/// Task-type tags resolved to regression
const REGRESSOR_TAGS: &[&str] = &["regressor", "regression", "regress"];

/// Learning rate used for classification fits
///
/// Classification ignores the configured learning rate and trains at this
/// fixed default instead; only regression honors `learning_rate`.
pub const CLASSIFICATION_LR: f64 = 0.002;

/// Estimator task type, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Classification,
    Regression,
}

impl TaskKind {
    /// Resolve a task tag by set membership
    ///
    /// Unrecognized tags (including misspellings and the empty string)
    /// silently resolve to regression.
    pub fn from_tag(tag: &str) -> Self {
        if CLASSIFIER_TAGS.contains(&tag) {
            TaskKind::Classification
        } else {
            TaskKind::Regression
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Classification => "classification",
            TaskKind::Regression => "regression",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed value for one named estimator parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f64),
    Bool(bool),
    Sizes(Vec<usize>),
    Schedule(Vec<BatchPhase>),
    Activation(Activation),
}

/// Estimator configuration
///
/// Plain data, merged via [`AdapterConfig::set_param`] before fitting; the
/// network is rebuilt from it on every fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Hidden layer widths
    pub hidden_layer_sizes: Vec<usize>,
    /// Dropout rate after every hidden layer
    pub dropout: f64,
    /// Batch schedule, applied in order
    pub batch_spec: Vec<BatchPhase>,
    /// Activation for hidden layers and the output head
    pub activation: Activation,
    /// Stddev of Gaussian noise added to the input during training
    pub input_noise: f64,
    /// Use maxout units instead of dense hidden layers
    pub use_maxout: bool,
    /// Constrain the head's incoming weight norms during training
    pub use_maxnorm: bool,
    /// Learning rate (regression only; see [`CLASSIFICATION_LR`])
    pub learning_rate: f64,
    /// Hold out a validation split on real-batch phases and stop stalled
    /// phases early
    pub stop_early: bool,
    /// Render an epoch progress bar while fitting
    pub show_progress: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: vec![100],
            dropout: 0.5,
            batch_spec: vec![BatchPhase::new(400, 1024), BatchPhase::full_batch(100)],
            activation: Activation::Sigmoid,
            input_noise: 0.0,
            use_maxout: false,
            use_maxnorm: false,
            learning_rate: 0.001,
            stop_early: false,
            show_progress: true,
        }
    }
}

impl AdapterConfig {
    /// Whether weight norms are constrained, accounting for the rule that
    /// maxout always forces the constraint on
    pub fn effective_maxnorm(&self) -> bool {
        self.use_maxnorm || self.use_maxout
    }

    /// Set one named parameter
    ///
    /// Unknown names and mismatched value types are caller errors.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match (name, value) {
            ("hidden_layer_sizes", ParamValue::Sizes(sizes)) => self.hidden_layer_sizes = sizes,
            ("dropout", ParamValue::Float(v)) => self.dropout = v,
            ("batch_spec", ParamValue::Schedule(schedule)) => self.batch_spec = schedule,
            ("activation", ParamValue::Activation(a)) => self.activation = a,
            ("input_noise", ParamValue::Float(v)) => self.input_noise = v,
            ("use_maxout", ParamValue::Bool(v)) => self.use_maxout = v,
            ("use_maxnorm", ParamValue::Bool(v)) => self.use_maxnorm = v,
            ("learning_rate", ParamValue::Float(v)) => self.learning_rate = v,
            ("stop_early", ParamValue::Bool(v)) => self.stop_early = v,
            ("show_progress", ParamValue::Bool(v)) => self.show_progress = v,
            (
                "hidden_layer_sizes" | "dropout" | "batch_spec" | "activation" | "input_noise"
                | "use_maxout" | "use_maxnorm" | "learning_rate" | "stop_early" | "show_progress",
                value,
            ) => {
                bail!("wrong value type for parameter {}: {:?}", name, value)
            }
            (unknown, _) => bail!("unknown parameter: {}", unknown),
        }
        Ok(())
    }

    /// Current parameters as (name, value) pairs
    pub fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            (
                "hidden_layer_sizes",
                ParamValue::Sizes(self.hidden_layer_sizes.clone()),
            ),
            ("dropout", ParamValue::Float(self.dropout)),
            ("batch_spec", ParamValue::Schedule(self.batch_spec.clone())),
            ("activation", ParamValue::Activation(self.activation)),
            ("input_noise", ParamValue::Float(self.input_noise)),
            ("use_maxout", ParamValue::Bool(self.use_maxout)),
            ("use_maxnorm", ParamValue::Bool(self.use_maxnorm)),
            ("learning_rate", ParamValue::Float(self.learning_rate)),
            ("stop_early", ParamValue::Bool(self.stop_early)),
            ("show_progress", ParamValue::Bool(self.show_progress)),
        ]
    }
}

/// The estimator protocol expected by model-selection tooling
///
/// Mirrors the conventional fit/predict/predict_proba/score surface plus
/// get/set-style parameter access, so search and cross-validation
/// utilities can drive any implementation interchangeably.
pub trait Estimator {
    /// Fit on a feature matrix and aligned target column
    fn fit(&mut self, features: &FeatureMatrix, targets: &[f32]) -> Result<()>;

    /// Predict labels (classification) or values (regression)
    ///
    /// Calling this before a successful `fit` is a precondition violation
    /// and returns an error.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f32>>;

    /// Predict class probabilities; regression passes through `predict`
    ///
    /// Errors when called before a successful `fit`.
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f32>>;

    /// Accuracy (classification) or R² (regression) on held-out data
    ///
    /// Errors when called before a successful `fit`.
    fn score(&self, features: &FeatureMatrix, targets: &[f32]) -> Result<f64>;

    /// Current parameters
    fn params(&self) -> Vec<(&'static str, ParamValue)>;

    /// Set one named parameter
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()>;
}
