pub mod architecture;
pub mod maxout;
pub mod metrics;
pub mod noise;

use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid, softplus, tanh};
use serde::{Deserialize, Serialize};

/// Activation function applied after each dense layer and the output head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Sigmoid,
    Tanh,
    Relu,
    Softplus,
    /// Identity; the only unbounded-both-ways choice, needed for regression heads
    Linear,
}

impl Activation {
    /// Apply the activation element-wise
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => tanh(x),
            Activation::Relu => relu(x),
            Activation::Softplus => softplus(x, 1.0),
            Activation::Linear => x,
        }
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
            Activation::Softplus => "softplus",
            Activation::Linear => "linear",
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            "softplus" => Ok(Activation::Softplus),
            "linear" | "identity" => Ok(Activation::Linear),
            other => Err(format!("unknown activation: {}", other)),
        }
    }
}

/// Network topology configuration
#[derive(Config, Debug)]
pub struct NetworkConfig {
    /// Number of input features
    pub input_size: usize,

    /// Hidden layer widths, outermost first
    pub hidden_sizes: Vec<usize>,

    /// Dropout rate applied after every hidden layer
    #[config(default = "0.5")]
    pub dropout: f64,

    /// Activation for dense hidden layers and the output head
    #[config(default = "Activation::Sigmoid")]
    pub activation: Activation,

    /// Standard deviation of Gaussian noise added to the input during training
    #[config(default = "0.0")]
    pub input_noise: f64,

    /// Replace dense hidden layers with maxout units
    #[config(default = "false")]
    pub use_maxout: bool,
}
