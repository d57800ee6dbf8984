use crate::data::FeatureMatrix;
use crate::estimator::{AdapterConfig, Estimator, ParamValue, TaskKind, CLASSIFICATION_LR};
use crate::model::architecture::{init_network, FeedForwardNet, LossKind};
use crate::model::{metrics, NetworkConfig};
use crate::training::trainer::NetworkTrainer;
use crate::training::TrainOptions;
use crate::utils::format_duration;
use anyhow::{anyhow, bail, ensure, Result};
use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::{debug, info};

use crate::TrainingBackend;

/// Decision threshold for classification labels
const LABEL_THRESHOLD: f32 = 0.5;

/// Trained network behind a task-specialized handle
///
/// The handle routes `predict`/`predict_proba` through task-appropriate
/// semantics; the variant is chosen by the adapter's task kind, never by
/// runtime inspection.
#[derive(Debug)]
enum TrainedModel<B: Backend> {
    Regressor(FeedForwardNet<B>),
    Classifier(FeedForwardNet<B>),
}

impl<B: Backend> TrainedModel<B> {
    /// Activated network output for the given rows
    fn raw_output(&self, features: &FeatureMatrix, device: &B::Device) -> Result<Vec<f32>> {
        let net = match self {
            TrainedModel::Regressor(net) | TrainedModel::Classifier(net) => net,
        };

        let input = features.to_tensor::<B>(device);
        tensor_to_vec(net.forward(input))
    }

    /// Labels for classifiers, values for regressors
    fn predict(&self, features: &FeatureMatrix, device: &B::Device) -> Result<Vec<f32>> {
        let output = self.raw_output(features, device)?;

        Ok(match self {
            TrainedModel::Regressor(_) => output,
            TrainedModel::Classifier(_) => output
                .into_iter()
                .map(|p| if p >= LABEL_THRESHOLD { 1.0 } else { 0.0 })
                .collect(),
        })
    }

    /// Class probabilities for classifiers; regressors pass predictions through
    fn predict_proba(&self, features: &FeatureMatrix, device: &B::Device) -> Result<Vec<f32>> {
        match self {
            TrainedModel::Regressor(_) => self.predict(features, device),
            TrainedModel::Classifier(_) => self.raw_output(features, device),
        }
    }
}

/// Feed-forward network estimator
///
/// Adapts a configurable feed-forward network to the estimator protocol so
/// hyperparameter search and cross-validation tooling can drive it like
/// any other model. Each fit builds a fresh network from the stored
/// configuration and replaces the previous trained model wholesale.
pub struct ModelAdapter<B: AutodiffBackend = TrainingBackend> {
    config: AdapterConfig,
    task: TaskKind,
    device: B::Device,
    model: Option<TrainedModel<B::InnerBackend>>,
}

impl<B: AutodiffBackend> ModelAdapter<B> {
    /// Create an unfitted adapter
    ///
    /// The task tag resolves by set membership; unrecognized tags default
    /// to regression.
    pub fn new(config: AdapterConfig, task_tag: &str) -> Self {
        Self::with_device(config, task_tag, B::Device::default())
    }

    /// Create an unfitted adapter on a specific device
    pub fn with_device(config: AdapterConfig, task_tag: &str, device: B::Device) -> Self {
        let task = TaskKind::from_tag(task_tag);
        debug!("Task tag {:?} resolved to {}", task_tag, task);

        let mut config = config;
        if config.use_maxout {
            config.use_maxnorm = true;
        }

        Self {
            config,
            task,
            device,
            model: None,
        }
    }

    /// Resolved task kind
    pub fn task(&self) -> TaskKind {
        self.task
    }

    /// Current configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Whether a trained model is available
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Merge named parameter overrides into the configuration
    pub fn configure(&mut self, overrides: &[(&str, ParamValue)]) -> Result<()> {
        for (name, value) in overrides {
            self.config.set_param(name, value.clone())?;
        }
        Ok(())
    }

    /// Merge overrides, then fit
    pub fn fit_with(
        &mut self,
        features: &FeatureMatrix,
        targets: &[f32],
        overrides: &[(&str, ParamValue)],
    ) -> Result<()> {
        self.configure(overrides)?;
        self.fit_inner(features, targets)
    }

    fn fit_inner(&mut self, features: &FeatureMatrix, targets: &[f32]) -> Result<()> {
        ensure!(
            features.rows() == targets.len(),
            "feature matrix has {} rows but {} targets were given",
            features.rows(),
            targets.len()
        );
        ensure!(features.rows() > 0, "cannot fit on an empty dataset");

        let network_config = NetworkConfig::new(
            features.cols(),
            self.config.hidden_layer_sizes.clone(),
        )
        .with_dropout(self.config.dropout)
        .with_activation(self.config.activation)
        .with_input_noise(self.config.input_noise)
        .with_use_maxout(self.config.use_maxout);

        let net = init_network::<B>(&network_config, &self.device);

        // classification trains at a fixed default rate; only regression
        // honors the configured one
        let (loss, learning_rate) = match self.task {
            TaskKind::Classification => (LossKind::BinaryCrossEntropy, CLASSIFICATION_LR),
            TaskKind::Regression => (LossKind::MeanSquaredError, self.config.learning_rate),
        };

        let options = TrainOptions {
            schedule: self.config.batch_spec.clone(),
            learning_rate,
            loss,
            stop_early: self.config.stop_early,
            constrain_weights: self.config.effective_maxnorm(),
            show_progress: self.config.show_progress,
        };

        info!(
            "Fitting {} estimator on {} rows with {} features",
            self.task,
            features.rows(),
            features.cols()
        );

        let trainer = NetworkTrainer::<B>::new(options, self.device.clone());
        let (trained, report) = trainer.train(net, features, targets)?;

        info!(
            "Fit complete in {} ({} epochs, final loss {:.6})",
            format_duration(report.duration_secs),
            report.epochs_run,
            report.final_loss
        );

        let inference = trained.valid();
        self.model = Some(match self.task {
            TaskKind::Classification => TrainedModel::Classifier(inference),
            TaskKind::Regression => TrainedModel::Regressor(inference),
        });

        Ok(())
    }

    fn fitted_model(&self) -> Result<&TrainedModel<B::InnerBackend>> {
        match &self.model {
            Some(model) => Ok(model),
            None => bail!("estimator has not been fitted; call fit first"),
        }
    }
}

impl<B: AutodiffBackend> Estimator for ModelAdapter<B> {
    fn fit(&mut self, features: &FeatureMatrix, targets: &[f32]) -> Result<()> {
        self.fit_inner(features, targets)
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f32>> {
        self.fitted_model()?.predict(features, &self.device)
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f32>> {
        self.fitted_model()?.predict_proba(features, &self.device)
    }

    fn score(&self, features: &FeatureMatrix, targets: &[f32]) -> Result<f64> {
        let predictions = self.predict(features)?;

        Ok(match self.task {
            TaskKind::Classification => metrics::accuracy(&predictions, targets),
            TaskKind::Regression => metrics::r2_score(&predictions, targets),
        })
    }

    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        self.config.params()
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.config.set_param(name, value)
    }
}

/// Read a rank-2 tensor back as a flat vector
fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("failed to read tensor data: {:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{synthetic, train_test_split, SplitConfig};
    use crate::model::Activation;
    use crate::training::BatchPhase;

    fn regression_config() -> AdapterConfig {
        AdapterConfig {
            hidden_layer_sizes: vec![10],
            dropout: 0.0,
            batch_spec: vec![BatchPhase::full_batch(300)],
            activation: Activation::Linear,
            learning_rate: 0.05,
            show_progress: false,
            ..AdapterConfig::default()
        }
    }

    #[test]
    fn test_predict_before_fit_is_an_error() {
        let adapter: ModelAdapter = ModelAdapter::new(regression_config(), "regression");
        let features = synthetic::linear(5, 2.0, 0.0, 1).features;

        assert!(!adapter.is_fitted());
        assert!(adapter.predict(&features).is_err());
        assert!(adapter.predict_proba(&features).is_err());
        assert!(adapter.score(&features, &[0.0; 5]).is_err());
    }

    #[test]
    fn test_regression_end_to_end() {
        <TrainingBackend as Backend>::seed(7);

        let dataset = synthetic::linear(50, 2.0, 0.0, 42);
        let (train, test) = train_test_split(
            &dataset,
            &SplitConfig {
                test_ratio: 0.3,
                seed: 42,
            },
        );

        let mut adapter: ModelAdapter = ModelAdapter::new(regression_config(), "regression");
        adapter.fit(&train.features, &train.targets).unwrap();

        let score = adapter.score(&test.features, &test.targets).unwrap();
        assert!(score > 0.5, "R² too low: {}", score);
    }

    #[test]
    fn test_regression_predict_proba_matches_predict() {
        <TrainingBackend as Backend>::seed(3);

        let dataset = synthetic::linear(30, 2.0, 0.0, 8);
        let mut adapter: ModelAdapter = ModelAdapter::new(regression_config(), "regressor");
        adapter.fit(&dataset.features, &dataset.targets).unwrap();

        let predictions = adapter.predict(&dataset.features).unwrap();
        let probabilities = adapter.predict_proba(&dataset.features).unwrap();

        assert_eq!(predictions, probabilities);
    }

    #[test]
    fn test_classification_end_to_end() {
        <TrainingBackend as Backend>::seed(11);

        let dataset = synthetic::two_blobs(60, 2.0, 13);
        let config = AdapterConfig {
            hidden_layer_sizes: vec![8],
            dropout: 0.0,
            batch_spec: vec![BatchPhase::full_batch(1500)],
            activation: Activation::Sigmoid,
            show_progress: false,
            ..AdapterConfig::default()
        };

        let mut adapter: ModelAdapter = ModelAdapter::new(config, "classifier");
        assert_eq!(adapter.task(), TaskKind::Classification);

        adapter.fit(&dataset.features, &dataset.targets).unwrap();

        let labels = adapter.predict(&dataset.features).unwrap();
        assert!(labels.iter().all(|&l| l == 0.0 || l == 1.0));

        let probabilities = adapter.predict_proba(&dataset.features).unwrap();
        assert!(probabilities.iter().all(|&p| (0.0..=1.0).contains(&p)));

        let score = adapter.score(&dataset.features, &dataset.targets).unwrap();
        assert!(score > 0.75, "accuracy too low: {}", score);
    }

    #[test]
    fn test_empty_hidden_stack_still_fits() {
        let dataset = synthetic::linear(20, 2.0, 0.0, 5);
        let config = AdapterConfig {
            hidden_layer_sizes: vec![],
            input_noise: 0.5,
            batch_spec: vec![BatchPhase::full_batch(5)],
            activation: Activation::Linear,
            dropout: 0.0,
            show_progress: false,
            ..AdapterConfig::default()
        };

        let mut adapter: ModelAdapter = ModelAdapter::new(config, "regression");
        adapter.fit(&dataset.features, &dataset.targets).unwrap();

        let predictions = adapter.predict(&dataset.features).unwrap();
        assert_eq!(predictions.len(), 20);
    }

    #[test]
    fn test_maxout_network_fits() {
        let dataset = synthetic::two_blobs(20, 1.0, 2);
        let config = AdapterConfig {
            hidden_layer_sizes: vec![8],
            use_maxout: true,
            dropout: 0.0,
            batch_spec: vec![BatchPhase::full_batch(3)],
            show_progress: false,
            ..AdapterConfig::default()
        };

        // maxout always trains under the weight-norm constraint
        assert!(config.effective_maxnorm());

        let mut adapter: ModelAdapter = ModelAdapter::new(config, "classify");
        assert!(adapter.config().use_maxnorm);

        adapter.fit(&dataset.features, &dataset.targets).unwrap();
        assert!(adapter.is_fitted());
    }

    #[test]
    fn test_fit_with_overrides() {
        let dataset = synthetic::linear(20, 2.0, 0.0, 4);
        let mut adapter: ModelAdapter = ModelAdapter::new(regression_config(), "regression");

        adapter
            .fit_with(
                &dataset.features,
                &dataset.targets,
                &[
                    ("hidden_layer_sizes", ParamValue::Sizes(vec![4])),
                    (
                        "batch_spec",
                        ParamValue::Schedule(vec![BatchPhase::full_batch(2)]),
                    ),
                ],
            )
            .unwrap();

        assert_eq!(adapter.config().hidden_layer_sizes, vec![4]);
        assert!(adapter.is_fitted());
    }

    #[test]
    fn test_fit_with_unknown_override_is_an_error() {
        let dataset = synthetic::linear(10, 2.0, 0.0, 4);
        let mut adapter: ModelAdapter = ModelAdapter::new(regression_config(), "regression");

        let result = adapter.fit_with(
            &dataset.features,
            &dataset.targets,
            &[("hiden_layer_sizes", ParamValue::Sizes(vec![4]))],
        );

        assert!(result.is_err());
        assert!(!adapter.is_fitted());
    }

    #[test]
    fn test_refit_replaces_model() {
        let dataset = synthetic::linear(20, 2.0, 0.0, 6);
        let mut config = regression_config();
        config.batch_spec = vec![BatchPhase::full_batch(50)];

        let mut adapter: ModelAdapter = ModelAdapter::new(config, "regression");
        adapter.fit(&dataset.features, &dataset.targets).unwrap();
        let first = adapter.predict(&dataset.features).unwrap();

        // a second fit trains a fresh network from scratch
        adapter.fit(&dataset.features, &dataset.targets).unwrap();
        let second = adapter.predict(&dataset.features).unwrap();

        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let dataset = synthetic::linear(10, 2.0, 0.0, 4);
        let mut adapter: ModelAdapter = ModelAdapter::new(regression_config(), "regression");

        assert!(adapter
            .fit(&dataset.features, &dataset.targets[..4])
            .is_err());
    }
}
