pub mod callbacks;
pub mod trainer;

use serde::{Deserialize, Serialize};

use crate::model::architecture::LossKind;

/// Epochs without validation-loss improvement before a phase halts
pub const EARLY_STOPPING_PATIENCE: usize = 20;

/// Fraction of training rows reserved as a validation split when a phase
/// monitors early stopping
pub const VALIDATION_SPLIT: f64 = 0.2;

/// Epoch count for the short full-batch refit run after an early-stopped
/// schedule
pub const REFIT_EPOCHS: i32 = 5;

/// Maximum incoming weight norm for the prediction head when the
/// weight-norm constraint is enabled
pub const MAXNORM_BOUND: f64 = 2.0;

/// One stage of the batch schedule: `epochs` passes at `batch_size` rows
///
/// A non-positive epoch count skips the phase. A negative batch size is
/// the full-dataset sentinel: the phase trains on one batch holding every
/// row. Phases run strictly in order against the same evolving network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPhase {
    /// Number of passes over the training rows
    pub epochs: i32,
    /// Rows per batch; negative means the whole dataset as one batch
    pub batch_size: i64,
}

impl BatchPhase {
    /// Sentinel batch size meaning "one batch with every training row"
    pub const FULL_BATCH: i64 = -1;

    /// Create a phase
    pub fn new(epochs: i32, batch_size: i64) -> Self {
        Self { epochs, batch_size }
    }

    /// Create a full-dataset phase
    pub fn full_batch(epochs: i32) -> Self {
        Self {
            epochs,
            batch_size: Self::FULL_BATCH,
        }
    }

    /// Whether this phase uses the full-dataset sentinel
    pub fn is_full_batch(&self) -> bool {
        self.batch_size < 0
    }

    /// Whether this phase runs at all
    pub fn is_skipped(&self) -> bool {
        self.epochs <= 0
    }

    /// Resolve the sentinel against the actual row count
    pub fn effective_batch_size(&self, num_rows: usize) -> usize {
        if self.batch_size < 0 {
            num_rows
        } else {
            self.batch_size as usize
        }
    }
}

/// Resolved options for one training run
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Batch schedule, applied in order
    pub schedule: Vec<BatchPhase>,
    /// Learning rate passed to the optimizer at every step
    pub learning_rate: f64,
    /// Training objective
    pub loss: LossKind,
    /// Monitor validation loss on real-batch phases and append the refit run
    pub stop_early: bool,
    /// Re-normalize the head weights after every optimizer step
    pub constrain_weights: bool,
    /// Render an epoch progress bar
    pub show_progress: bool,
}

/// Summary of a completed training run
#[derive(Debug, Clone, Default)]
pub struct FitReport {
    /// Phases that actually ran (skipped phases excluded)
    pub phases_run: usize,
    /// Total epochs completed across phases and the refit run
    pub epochs_run: usize,
    /// Phases halted by the early-stopping monitor
    pub early_stopped_phases: usize,
    /// Mean training loss over the final completed epoch
    pub final_loss: f64,
    /// Wall-clock training time in seconds
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_batch_sentinel() {
        let phase = BatchPhase::full_batch(5);

        assert!(phase.is_full_batch());
        assert_eq!(phase.effective_batch_size(128), 128);
    }

    #[test]
    fn test_real_batch_size_passes_through() {
        let phase = BatchPhase::new(10, 32);

        assert!(!phase.is_full_batch());
        assert_eq!(phase.effective_batch_size(128), 32);
    }

    #[test]
    fn test_non_positive_epochs_skip_phase() {
        assert!(BatchPhase::new(0, 32).is_skipped());
        assert!(BatchPhase::new(-3, 32).is_skipped());
        assert!(!BatchPhase::new(1, 32).is_skipped());
    }

    #[test]
    fn test_batch_phase_serde_round_trip() {
        let schedule = vec![BatchPhase::new(400, 1024), BatchPhase::full_batch(100)];

        let json = serde_json::to_string(&schedule).unwrap();
        let parsed: Vec<BatchPhase> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, schedule);
    }
}
