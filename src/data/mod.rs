pub mod loader;

use anyhow::{bail, Result};
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::random::seeded_rng;

/// Dense row-major feature matrix (rows = samples, columns = features)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Create matrix from a flat row-major buffer
    pub fn new(values: Vec<f32>, rows: usize, cols: usize) -> Result<Self> {
        if values.len() != rows * cols {
            bail!(
                "buffer length {} does not match shape {}x{}",
                values.len(),
                rows,
                cols
            );
        }
        Ok(Self { values, rows, cols })
    }

    /// Create matrix from per-sample rows; all rows must have the same width
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);

        let mut values = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                bail!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n_cols
                );
            }
            values.extend(row);
        }

        Ok(Self {
            values,
            rows: n_rows,
            cols: n_cols,
        })
    }

    /// Number of samples
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of features
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Single sample as a slice
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.cols;
        &self.values[start..start + self.cols]
    }

    /// Sub-matrix holding rows `[start, end)`
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        Self {
            values: self.values[start * self.cols..end * self.cols].to_vec(),
            rows: end - start,
            cols: self.cols,
        }
    }

    /// Sub-matrix holding the given rows in order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut values = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            values.extend_from_slice(self.row(i));
        }
        Self {
            values,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Upload as a rank-2 tensor on the given device
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.values.clone(), [self.rows, self.cols]),
            device,
        )
    }
}

/// A feature matrix with its aligned target column
#[derive(Debug, Clone)]
pub struct TabularDataset {
    /// Input features
    pub features: FeatureMatrix,
    /// Target values, one per row
    pub targets: Vec<f32>,
}

impl TabularDataset {
    /// Create dataset, checking the row counts agree
    pub fn new(features: FeatureMatrix, targets: Vec<f32>) -> Result<Self> {
        if features.rows() != targets.len() {
            bail!(
                "feature matrix has {} rows but {} targets were given",
                features.rows(),
                targets.len()
            );
        }
        Ok(Self { features, targets })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Held-out split configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing
    pub test_ratio: f64,
    /// Random seed for the shuffle
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 2026,
        }
    }
}

/// Shuffle rows and split into (train, test)
pub fn train_test_split(
    dataset: &TabularDataset,
    config: &SplitConfig,
) -> (TabularDataset, TabularDataset) {
    info!("Splitting dataset with seed {}", config.seed);

    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();

    let mut rng = seeded_rng(config.seed);
    indices.shuffle(&mut rng);

    let n_test = (n as f64 * config.test_ratio) as usize;
    let (test_idx, train_idx) = indices.split_at(n_test);

    let take = |idx: &[usize]| TabularDataset {
        features: dataset.features.select_rows(idx),
        targets: idx.iter().map(|&i| dataset.targets[i]).collect(),
    };

    let train = take(train_idx);
    let test = take(test_idx);

    info!("Dataset split: train={}, test={}", train.len(), test.len());

    (train, test)
}

/// Synthetic dataset generators for demos and tests
pub mod synthetic {
    use rand::Rng;

    use super::{FeatureMatrix, TabularDataset};
    use crate::utils::random::seeded_rng;

    /// Single-feature linear relation `y = slope * x + noise`, x drawn from [0, 1)
    pub fn linear(n_samples: usize, slope: f32, noise_std: f32, seed: u64) -> TabularDataset {
        let mut rng = seeded_rng(seed);

        let xs: Vec<f32> = (0..n_samples).map(|_| rng.gen::<f32>()).collect();
        let targets: Vec<f32> = xs
            .iter()
            .map(|&x| {
                let noise = if noise_std > 0.0 {
                    (rng.gen::<f32>() - 0.5) * 2.0 * noise_std
                } else {
                    0.0
                };
                slope * x + noise
            })
            .collect();

        TabularDataset {
            features: FeatureMatrix {
                values: xs,
                rows: n_samples,
                cols: 1,
            },
            targets,
        }
    }

    /// Two-feature binary classes separated along the first feature
    pub fn two_blobs(n_samples: usize, separation: f32, seed: u64) -> TabularDataset {
        let mut rng = seeded_rng(seed);

        let mut values = Vec::with_capacity(n_samples * 2);
        let mut targets = Vec::with_capacity(n_samples);

        for i in 0..n_samples {
            let label = (i % 2) as f32;
            let center = if label > 0.5 { separation } else { -separation };
            values.push(center + rng.gen::<f32>() - 0.5);
            values.push(rng.gen::<f32>() - 0.5);
            targets.push(label);
        }

        TabularDataset {
            features: FeatureMatrix {
                values,
                rows: n_samples,
                cols: 2,
            },
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_shape_checks() {
        assert!(FeatureMatrix::new(vec![0.0; 6], 2, 3).is_ok());
        assert!(FeatureMatrix::new(vec![0.0; 5], 2, 3).is_err());

        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(FeatureMatrix::from_rows(ragged).is_err());
    }

    #[test]
    fn test_matrix_row_access() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);

        let sliced = m.slice_rows(1, 2);
        assert_eq!(sliced.rows(), 1);
        assert_eq!(sliced.row(0), &[3.0, 4.0]);

        let selected = m.select_rows(&[1, 0]);
        assert_eq!(selected.row(0), &[3.0, 4.0]);
        assert_eq!(selected.row(1), &[1.0, 2.0]);
    }

    #[test]
    fn test_dataset_row_count_invariant() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(TabularDataset::new(m.clone(), vec![0.0, 1.0]).is_ok());
        assert!(TabularDataset::new(m, vec![0.0]).is_err());
    }

    #[test]
    fn test_train_test_split_sizes() {
        let dataset = synthetic::linear(50, 2.0, 0.0, 7);
        let config = SplitConfig {
            test_ratio: 0.2,
            seed: 7,
        };

        let (train, test) = train_test_split(&dataset, &config);

        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 40);
        assert_eq!(train.features.cols(), 1);
    }

    #[test]
    fn test_synthetic_linear_relation() {
        let dataset = synthetic::linear(20, 2.0, 0.0, 1);

        for i in 0..dataset.len() {
            let x = dataset.features.row(i)[0];
            assert!((dataset.targets[i] - 2.0 * x).abs() < 1e-6);
        }
    }
}
