use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// Number of parallel projections per maxout unit
pub const NUM_MAXOUT_FEATURES: usize = 2;

/// Maxout dense layer
///
/// Computes the element-wise maximum over several parallel linear
/// projections of the input, acting as a learned piecewise-linear
/// activation in place of a fixed nonlinearity.
#[derive(Module, Debug)]
pub struct MaxoutDense<B: Backend> {
    /// First projection; kept separate so the layer always has one
    first: Linear<B>,
    /// Remaining parallel projections
    rest: Vec<Linear<B>>,
}

/// Maxout layer configuration
#[derive(Config, Debug)]
pub struct MaxoutDenseConfig {
    /// Input feature dimension
    pub d_input: usize,
    /// Output feature dimension
    pub d_output: usize,
    /// Number of parallel projections
    #[config(default = "NUM_MAXOUT_FEATURES")]
    pub num_features: usize,
}

impl MaxoutDenseConfig {
    /// Initialize maxout layer
    pub fn init<B: Backend>(&self, device: &B::Device) -> MaxoutDense<B> {
        let projection = || {
            LinearConfig::new(self.d_input, self.d_output)
                .with_bias(true)
                .init(device)
        };

        MaxoutDense {
            first: projection(),
            rest: (1..self.num_features).map(|_| projection()).collect(),
        }
    }
}

impl<B: Backend> MaxoutDense<B> {
    /// Forward pass
    ///
    /// # Shapes
    /// - input: `[batch_size, d_input]`
    /// - output: `[batch_size, d_output]`
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.rest.iter().fold(
            self.first.forward(input.clone()),
            |acc, projection| acc.max_pair(projection.forward(input.clone())),
        )
    }
}
