use crate::data::FeatureMatrix;
use crate::model::architecture::FeedForwardNet;
use crate::training::callbacks::EarlyStopping;
use crate::training::{
    BatchPhase, FitReport, TrainOptions, EARLY_STOPPING_PATIENCE, MAXNORM_BOUND, REFIT_EPOCHS,
    VALIDATION_SPLIT,
};
use anyhow::{ensure, Result};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, TensorData};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{debug, info};

type AdamOptimizer<B> = OptimizerAdaptor<Adam, FeedForwardNet<B>, B>;

/// Executes a batch schedule against a feed-forward network
///
/// Phases run in order on the same evolving network and share one
/// optimizer, so later phases continue training rather than restart it.
pub struct NetworkTrainer<B: AutodiffBackend> {
    options: TrainOptions,
    device: B::Device,
}

impl<B: AutodiffBackend> NetworkTrainer<B> {
    /// Create trainer
    pub fn new(options: TrainOptions, device: B::Device) -> Self {
        Self { options, device }
    }

    /// Train the network through the full batch schedule
    ///
    /// With early stopping enabled, a short full-batch refit run follows
    /// the scheduled phases; it never holds out a validation split.
    pub fn train(
        &self,
        net: FeedForwardNet<B>,
        features: &FeatureMatrix,
        targets: &[f32],
    ) -> Result<(FeedForwardNet<B>, FitReport)> {
        ensure!(
            features.rows() == targets.len(),
            "feature matrix has {} rows but {} targets were given",
            features.rows(),
            targets.len()
        );

        let start = Instant::now();
        let mut model = net;
        let mut optim = AdamConfig::new()
            .with_beta_1(0.9)
            .with_beta_2(0.999)
            .with_epsilon(1e-8)
            .init();
        let mut report = FitReport::default();

        for (index, phase) in self.options.schedule.iter().enumerate() {
            if phase.is_skipped() {
                debug!("Phase {}: non-positive epoch count, skipped", index + 1);
                continue;
            }
            model = self.run_phase(model, &mut optim, features, targets, *phase, index, &mut report)?;
        }

        if self.options.stop_early {
            info!("Refit: {} epochs on the full dataset", REFIT_EPOCHS);
            let refit = BatchPhase::full_batch(REFIT_EPOCHS);
            let index = self.options.schedule.len();
            model = self.run_phase(model, &mut optim, features, targets, refit, index, &mut report)?;
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        info!(
            "Training finished: {} epochs over {} phases, final loss {:.6}",
            report.epochs_run, report.phases_run, report.final_loss
        );

        Ok((model, report))
    }

    #[allow(clippy::too_many_arguments)]
    fn run_phase(
        &self,
        mut model: FeedForwardNet<B>,
        optim: &mut AdamOptimizer<B>,
        features: &FeatureMatrix,
        targets: &[f32],
        phase: BatchPhase,
        index: usize,
        report: &mut FitReport,
    ) -> Result<FeedForwardNet<B>> {
        let num_rows = features.rows();
        let batch_size = phase.effective_batch_size(num_rows);
        ensure!(batch_size > 0, "phase {} has zero batch size", index + 1);

        // validation only applies to real-batch phases, never the sentinel
        let use_validation = self.options.stop_early && !phase.is_full_batch();
        let train_rows = if use_validation {
            num_rows - (num_rows as f64 * VALIDATION_SPLIT) as usize
        } else {
            num_rows
        };
        ensure!(
            train_rows > 0,
            "phase {} has no rows left after the validation split",
            index + 1
        );

        let validation = use_validation
            .then(|| (features.slice_rows(train_rows, num_rows), &targets[train_rows..]));
        let mut monitor = use_validation.then(|| EarlyStopping::new(EARLY_STOPPING_PATIENCE));

        info!(
            "Phase {}: {} epochs at batch size {}",
            index + 1,
            phase.epochs,
            batch_size
        );

        let progress = self.options.show_progress.then(|| {
            let bar = ProgressBar::new(phase.epochs as u64);
            bar.set_style(ProgressStyle::default_bar());
            bar
        });

        report.phases_run += 1;

        for epoch in 0..phase.epochs {
            let mut epoch_loss = 0.0;
            let mut num_batches = 0;

            let mut row = 0;
            while row < train_rows {
                let end = (row + batch_size).min(train_rows);
                let x = features.slice_rows(row, end).to_tensor::<B>(&self.device);
                let y = targets_tensor::<B>(&targets[row..end], &self.device);

                let loss = model.forward_loss(x, y, self.options.loss);
                epoch_loss += loss.clone().into_scalar().elem::<f64>();
                num_batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.options.learning_rate, model, grads);

                if self.options.constrain_weights {
                    model = model.constrain_head_norms(MAXNORM_BOUND);
                }

                row = end;
            }

            report.epochs_run += 1;
            report.final_loss = epoch_loss / num_batches as f64;

            if let Some(bar) = &progress {
                bar.inc(1);
            }

            if let (Some(monitor), Some((val_x, val_y))) = (monitor.as_mut(), validation.as_ref())
            {
                let val_loss = self.validation_loss(&model, val_x, val_y);
                debug!(
                    "Epoch {}: train loss {:.6}, val loss {:.6}",
                    epoch + 1,
                    report.final_loss,
                    val_loss
                );

                if monitor.observe(val_loss) {
                    info!(
                        "Phase {}: no validation improvement for {} epochs, stopping at epoch {}",
                        index + 1,
                        EARLY_STOPPING_PATIENCE,
                        epoch + 1
                    );
                    report.early_stopped_phases += 1;
                    break;
                }
            }
        }

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        Ok(model)
    }

    /// Validation loss on the inference copy of the model (dropout and
    /// input noise inactive)
    fn validation_loss(
        &self,
        model: &FeedForwardNet<B>,
        features: &FeatureMatrix,
        targets: &[f32],
    ) -> f64 {
        let inner = model.valid();
        let x = features.to_tensor::<B::InnerBackend>(&self.device);
        let y = targets_tensor::<B::InnerBackend>(targets, &self.device);

        inner
            .forward_loss(x, y, self.options.loss)
            .into_scalar()
            .elem::<f64>()
    }
}

/// Upload a target slice as a rank-1 tensor
fn targets_tensor<B: Backend>(targets: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::new(targets.to_vec(), [targets.len()]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;
    use crate::model::architecture::{init_network, LossKind};
    use crate::model::{Activation, NetworkConfig};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn options(schedule: Vec<BatchPhase>, learning_rate: f64, stop_early: bool) -> TrainOptions {
        TrainOptions {
            schedule,
            learning_rate,
            loss: LossKind::MeanSquaredError,
            stop_early,
            constrain_weights: false,
            show_progress: false,
        }
    }

    fn linear_net(device: &<TestBackend as Backend>::Device) -> FeedForwardNet<TestBackend> {
        let config = NetworkConfig::new(1, vec![10])
            .with_dropout(0.0)
            .with_activation(Activation::Linear);
        init_network::<TestBackend>(&config, device)
    }

    #[test]
    fn test_training_reduces_loss() {
        let device = Default::default();
        let dataset = synthetic::linear(50, 2.0, 0.0, 11);
        let net = linear_net(&device);

        let trainer = NetworkTrainer::<TestBackend>::new(
            options(vec![BatchPhase::full_batch(50)], 0.05, false),
            device,
        );

        let initial = trainer.validation_loss(&net, &dataset.features, &dataset.targets);
        let (trained, report) = trainer
            .train(net, &dataset.features, &dataset.targets)
            .unwrap();
        let after = trainer.validation_loss(&trained, &dataset.features, &dataset.targets);

        assert_eq!(report.phases_run, 1);
        assert_eq!(report.epochs_run, 50);
        assert!(after < initial);
    }

    #[test]
    fn test_zero_epoch_phase_has_no_effect() {
        let device = <TestBackend as Backend>::Device::default();
        let dataset = synthetic::linear(20, 2.0, 0.0, 3);
        let net = linear_net(&device);

        let probe = dataset.features.to_tensor::<NdArray<f32>>(&device);
        let before = net
            .valid()
            .forward(probe.clone())
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        let trainer = NetworkTrainer::<TestBackend>::new(
            options(vec![BatchPhase::new(0, 8), BatchPhase::new(-2, 8)], 0.05, false),
            device,
        );
        let (trained, report) = trainer
            .train(net, &dataset.features, &dataset.targets)
            .unwrap();

        let after = trained
            .valid()
            .forward(probe)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert_eq!(report.phases_run, 0);
        assert_eq!(report.epochs_run, 0);
        assert_eq!(before, after);
    }

    #[test]
    fn test_early_stopping_halts_stalled_phase() {
        let device = <TestBackend as Backend>::Device::default();
        let dataset = synthetic::linear(50, 2.0, 0.0, 5);
        let net = linear_net(&device);

        // zero learning rate: validation loss can never improve
        let trainer = NetworkTrainer::<TestBackend>::new(
            options(vec![BatchPhase::new(100, 8)], 0.0, true),
            device,
        );
        let (_, report) = trainer
            .train(net, &dataset.features, &dataset.targets)
            .unwrap();

        assert_eq!(report.early_stopped_phases, 1);
        // patience epochs plus the first observation, then the refit run
        assert!(report.epochs_run <= EARLY_STOPPING_PATIENCE + 1 + REFIT_EPOCHS as usize + 1);
        assert!(report.epochs_run < 100);
    }

    #[test]
    fn test_refit_runs_after_schedule() {
        let device = <TestBackend as Backend>::Device::default();
        let dataset = synthetic::linear(20, 2.0, 0.0, 9);
        let net = linear_net(&device);

        // full-batch phase: no validation split, so the refit is the only extra
        let trainer = NetworkTrainer::<TestBackend>::new(
            options(vec![BatchPhase::full_batch(2)], 0.01, true),
            device,
        );
        let (_, report) = trainer
            .train(net, &dataset.features, &dataset.targets)
            .unwrap();

        assert_eq!(report.phases_run, 2);
        assert_eq!(report.epochs_run, 2 + REFIT_EPOCHS as usize);
        assert_eq!(report.early_stopped_phases, 0);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let device = <TestBackend as Backend>::Device::default();
        let dataset = synthetic::linear(10, 2.0, 0.0, 1);
        let net = linear_net(&device);

        let trainer = NetworkTrainer::<TestBackend>::new(
            options(vec![BatchPhase::full_batch(1)], 0.01, false),
            device,
        );

        let result = trainer.train(net, &dataset.features, &dataset.targets[..5]);
        assert!(result.is_err());
    }
}
