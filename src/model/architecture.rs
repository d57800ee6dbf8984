use crate::model::maxout::{MaxoutDense, MaxoutDenseConfig, NUM_MAXOUT_FEATURES};
use crate::model::noise::{GaussianNoise, GaussianNoiseConfig};
use crate::model::{Activation, NetworkConfig};
use burn::module::Ignored;
use burn::nn::loss::{BinaryCrossEntropyLossConfig, MseLoss, Reduction};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;

/// Training objective, selected by task type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// Binary cross-entropy over the activated head output
    BinaryCrossEntropy,
    /// Mean squared error over the activated head output
    MeanSquaredError,
}

/// Feed-forward network with a configurable hidden stack
///
/// Layer order: optional Gaussian input noise, then per hidden width either
/// a dense layer + activation or a maxout unit, each followed by dropout,
/// then a single-output dense head whose output passes through the same
/// activation. The hidden stack is homogeneous: `dense` and `maxout` are
/// never both populated.
#[derive(Module, Debug)]
pub struct FeedForwardNet<B: Backend> {
    /// Input noise layer, present when the configured stddev is positive
    noise: Option<GaussianNoise>,
    /// Dense hidden layers (standard path)
    dense: Vec<Linear<B>>,
    /// Maxout hidden layers (maxout path)
    maxout: Vec<MaxoutDense<B>>,
    /// Dropout applied after every hidden layer
    dropout: Dropout,
    /// Single-output prediction head
    output: Linear<B>,
    /// Activation for dense layers and the head output
    activation: Ignored<Activation>,
}

impl<B: Backend> FeedForwardNet<B> {
    /// Forward pass
    ///
    /// # Shapes
    /// - input: `[batch_size, input_size]`
    /// - output: `[batch_size, 1]`, already activated
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;

        if let Some(noise) = &self.noise {
            x = noise.forward(x);
        }

        if self.maxout.is_empty() {
            for layer in &self.dense {
                x = self.activation.0.apply(layer.forward(x));
                x = self.dropout.forward(x);
            }
        } else {
            for layer in &self.maxout {
                x = layer.forward(x);
                x = self.dropout.forward(x);
            }
        }

        self.activation.0.apply(self.output.forward(x))
    }

    /// Forward pass producing the training loss
    pub fn forward_loss(
        &self,
        input: Tensor<B, 2>,
        targets: Tensor<B, 1>,
        loss: LossKind,
    ) -> Tensor<B, 1> {
        let output: Tensor<B, 1> = self.forward(input).squeeze(1);

        match loss {
            LossKind::BinaryCrossEntropy => BinaryCrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output, targets.int()),
            LossKind::MeanSquaredError => MseLoss::new().forward(output, targets, Reduction::Mean),
        }
    }

    /// Rescale the head's incoming weight columns so each stays within `bound`
    ///
    /// Applied after every optimizer step when the weight-norm constraint is
    /// enabled, mirroring a per-update maxnorm kernel constraint.
    pub fn constrain_head_norms(mut self, bound: f64) -> Self {
        self.output.weight = self.output.weight.map(|weight| {
            let norms = weight.clone().powf_scalar(2.0).sum_dim(0).sqrt();
            let scale = norms.clone().clamp_max(bound).div(norms.clamp_min(1e-12));
            weight.mul(scale)
        });
        self
    }

    /// Number of hidden layers
    pub fn num_hidden_layers(&self) -> usize {
        self.dense.len() + self.maxout.len()
    }

    /// Whether the input noise layer is present
    pub fn has_noise_layer(&self) -> bool {
        self.noise.is_some()
    }
}

/// Initialize a network from configuration
///
/// Hidden widths chain: each layer's input dimension is the previous
/// layer's output width, starting from `input_size`. A maxout unit outputs
/// `width / NUM_MAXOUT_FEATURES` values.
pub fn init_network<B: Backend>(config: &NetworkConfig, device: &B::Device) -> FeedForwardNet<B> {
    let noise = (config.input_noise > 0.0)
        .then(|| GaussianNoiseConfig::new(config.input_noise).init());

    let mut dense = Vec::new();
    let mut maxout = Vec::new();
    let mut d_in = config.input_size;

    for &width in &config.hidden_sizes {
        if config.use_maxout {
            let d_out = width / NUM_MAXOUT_FEATURES;
            maxout.push(MaxoutDenseConfig::new(d_in, d_out).init(device));
            d_in = d_out;
        } else {
            dense.push(LinearConfig::new(d_in, width).with_bias(true).init(device));
            d_in = width;
        }
    }

    let output = LinearConfig::new(d_in, 1).with_bias(true).init(device);
    let dropout = DropoutConfig::new(config.dropout).init();

    FeedForwardNet {
        noise,
        dense,
        maxout,
        dropout,
        output,
        activation: Ignored(config.activation),
    }
}
