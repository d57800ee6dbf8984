use burn::prelude::*;
use burn::tensor::Distribution;

/// Additive Gaussian input noise
///
/// Samples fresh zero-mean noise on every training forward pass. Like
/// dropout, the layer is active only on an autodiff backend, so inference
/// passes see the input unchanged.
#[derive(Module, Clone, Debug)]
pub struct GaussianNoise {
    /// Noise standard deviation
    pub stddev: f64,
}

/// Gaussian noise layer configuration
#[derive(Config, Debug)]
pub struct GaussianNoiseConfig {
    /// Noise standard deviation
    pub stddev: f64,
}

impl GaussianNoiseConfig {
    /// Initialize Gaussian noise layer
    pub fn init(&self) -> GaussianNoise {
        GaussianNoise {
            stddev: self.stddev,
        }
    }
}

impl GaussianNoise {
    /// Add noise to the input when training, pass through otherwise
    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        if !B::ad_enabled() || self.stddev <= 0.0 {
            return input;
        }

        let noise = input.random_like(Distribution::Normal(0.0, self.stddev));
        input + noise
    }
}
