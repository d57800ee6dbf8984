use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Activation;
use crate::training::BatchPhase;

/// netfit: feed-forward neural network estimator
#[derive(Parser, Debug)]
#[command(name = "netfit")]
#[command(about = "Feed-forward neural network estimator")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit an estimator on a tabular file and report its score
    Train(TrainArgs),

    /// Run the built-in demo on a synthetic linear dataset
    Demo(DemoArgs),
}

/// Training arguments
#[derive(Parser, Debug)]
pub struct TrainArgs {
    /// Input data file (CSV or TSV, optionally gzipped)
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Target column name; defaults to the last column
    #[arg(short, long)]
    pub target: Option<String>,

    /// Task type tag (unrecognized tags fall back to regression)
    #[arg(long, default_value = "regression")]
    pub task: String,

    /// Hidden layer widths
    #[arg(long, value_delimiter = ',', default_value = "100")]
    pub hidden_sizes: Vec<usize>,

    /// Dropout rate after every hidden layer
    #[arg(long, default_value = "0.5")]
    pub dropout: f64,

    /// Activation function (sigmoid, tanh, relu, softplus, linear)
    #[arg(long, default_value = "sigmoid")]
    pub activation: Activation,

    /// Gaussian input noise standard deviation
    #[arg(long, default_value = "0.0")]
    pub input_noise: f64,

    /// Use maxout hidden units (forces the weight-norm constraint on)
    #[arg(long)]
    pub use_maxout: bool,

    /// Constrain the output head's weight norms during training
    #[arg(long)]
    pub use_maxnorm: bool,

    /// Learning rate (regression only)
    #[arg(long, default_value = "0.001")]
    pub learning_rate: f64,

    /// Stop stalled phases early on a validation split
    #[arg(long)]
    pub stop_early: bool,

    /// Batch schedule as epochsxbatch pairs, e.g. "400x1024,100x-1"
    /// (batch -1 means the full dataset as one batch)
    #[arg(long, value_delimiter = ',', value_parser = parse_batch_phase, default_value = "400x1024,100x-1")]
    pub batch_spec: Vec<BatchPhase>,

    /// Fraction of rows held out for testing
    #[arg(long, default_value = "0.2")]
    pub test_ratio: f64,

    /// Random seed for the split
    #[arg(long, default_value = "2026")]
    pub seed: u64,

    /// Write scores as JSON to this file
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

/// Demo arguments
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Number of synthetic samples
    #[arg(long, default_value = "200")]
    pub samples: usize,

    /// Slope of the synthetic linear relation y = slope * x
    #[arg(long, default_value = "2.0")]
    pub slope: f32,

    /// Noise added to the synthetic targets
    #[arg(long, default_value = "0.05")]
    pub noise: f32,

    /// Random seed
    #[arg(long, default_value = "2026")]
    pub seed: u64,
}

/// Parse one schedule phase like "400x1024"
fn parse_batch_phase(pair: &str) -> Result<BatchPhase, String> {
    let (epochs, batch) = pair
        .split_once('x')
        .ok_or_else(|| format!("expected epochsxbatch, got {:?}", pair))?;
    let epochs: i32 = epochs
        .trim()
        .parse()
        .map_err(|_| format!("invalid epoch count: {:?}", epochs))?;
    let batch: i64 = batch
        .trim()
        .parse()
        .map_err(|_| format!("invalid batch size: {:?}", batch))?;
    Ok(BatchPhase::new(epochs, batch))
}

/// Parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Setup logging based on verbosity
pub fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from(["netfit", "train", "-i", "data.csv"]);

        match cli.command {
            Commands::Train(args) => {
                assert_eq!(args.input, PathBuf::from("data.csv"));
                assert_eq!(args.hidden_sizes, vec![100]);
                assert_eq!(args.task, "regression");
                assert_eq!(args.activation, Activation::Sigmoid);
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_train_args() {
        let cli = Cli::parse_from([
            "netfit",
            "train",
            "-i",
            "data.csv",
            "--task",
            "classifier",
            "--hidden-sizes",
            "64,32",
            "--activation",
            "relu",
            "--stop-early",
        ]);

        match cli.command {
            Commands::Train(args) => {
                assert_eq!(args.task, "classifier");
                assert_eq!(args.hidden_sizes, vec![64, 32]);
                assert_eq!(args.activation, Activation::Relu);
                assert!(args.stop_early);
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_parse_batch_phase() {
        assert_eq!(parse_batch_phase("400x1024").unwrap(), BatchPhase::new(400, 1024));
        assert!(parse_batch_phase("100x-1").unwrap().is_full_batch());

        assert!(parse_batch_phase("400").is_err());
        assert!(parse_batch_phase("axb").is_err());
    }

    #[test]
    fn test_batch_spec_argument() {
        let cli = Cli::parse_from(["netfit", "train", "-i", "d.csv", "--batch-spec", "5x-1,10x32"]);

        match cli.command {
            Commands::Train(args) => {
                assert_eq!(
                    args.batch_spec,
                    vec![BatchPhase::full_batch(5), BatchPhase::new(10, 32)]
                );
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_demo_args_defaults() {
        let cli = Cli::parse_from(["netfit", "demo"]);

        match cli.command {
            Commands::Demo(args) => {
                assert_eq!(args.samples, 200);
                assert_eq!(args.slope, 2.0);
            }
            _ => panic!("Expected Demo command"),
        }
    }
}
