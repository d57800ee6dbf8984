use anyhow::{Context, Result};
use netfit::cli::{parse_args, setup_logging, Commands, DemoArgs, TrainArgs};
use netfit::data::loader::{LoaderConfig, TabularLoader};
use netfit::data::{synthetic, train_test_split, SplitConfig};
use netfit::estimator::adapter::ModelAdapter;
use netfit::estimator::{AdapterConfig, Estimator};
use netfit::model::Activation;
use netfit::training::BatchPhase;
use serde::Serialize;
use tracing::{error, info};

fn main() {
    let cli = parse_args();

    setup_logging(cli.verbose);

    info!("{}", netfit::info());

    let result = match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Demo(args) => run_demo(args),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Scores written to the optional JSON report
#[derive(Debug, Serialize)]
struct ScoreReport {
    task: String,
    train_score: f64,
    test_score: f64,
    train_rows: usize,
    test_rows: usize,
}

fn run_train(args: TrainArgs) -> Result<()> {
    info!("Input file: {:?}", args.input);

    let loader = TabularLoader::with_config(LoaderConfig {
        has_header: true,
        target_column: args.target.clone(),
    });
    let dataset = loader
        .load(&args.input)
        .with_context(|| format!("Failed to load data from {:?}", args.input))?;

    let split_config = SplitConfig {
        test_ratio: args.test_ratio,
        seed: args.seed,
    };
    let (train, test) = train_test_split(&dataset, &split_config);

    let config = AdapterConfig {
        hidden_layer_sizes: args.hidden_sizes,
        dropout: args.dropout,
        batch_spec: args.batch_spec,
        activation: args.activation,
        input_noise: args.input_noise,
        use_maxout: args.use_maxout,
        use_maxnorm: args.use_maxnorm,
        learning_rate: args.learning_rate,
        stop_early: args.stop_early,
        show_progress: true,
    };

    let mut adapter: ModelAdapter = ModelAdapter::new(config, &args.task);
    info!("Task resolved to {}", adapter.task());

    adapter
        .fit(&train.features, &train.targets)
        .context("Training failed")?;

    let train_score = adapter.score(&train.features, &train.targets)?;
    let test_score = adapter.score(&test.features, &test.targets)?;

    info!("Train score: {:.4}", train_score);
    info!("Test score: {:.4}", test_score);

    if let Some(report_path) = args.report {
        let report = ScoreReport {
            task: adapter.task().to_string(),
            train_score,
            test_score,
            train_rows: train.len(),
            test_rows: test.len(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("Failed to write report to {:?}", report_path))?;
        info!("Report saved to: {:?}", report_path);
    }

    Ok(())
}

fn run_demo(args: DemoArgs) -> Result<()> {
    info!(
        "Generating {} samples of y = {}x (noise {})",
        args.samples, args.slope, args.noise
    );

    let dataset = synthetic::linear(args.samples, args.slope, args.noise, args.seed);
    let split_config = SplitConfig {
        test_ratio: 0.33,
        seed: args.seed,
    };
    let (train, test) = train_test_split(&dataset, &split_config);

    // a regression head needs an unbounded activation
    let config = AdapterConfig {
        hidden_layer_sizes: vec![10],
        dropout: 0.0,
        batch_spec: vec![BatchPhase::full_batch(300)],
        activation: Activation::Linear,
        learning_rate: 0.05,
        ..AdapterConfig::default()
    };

    let mut adapter: ModelAdapter = ModelAdapter::new(config, "regression");
    adapter
        .fit(&train.features, &train.targets)
        .context("Training failed")?;

    let predictions = adapter.predict(&test.features)?;
    info!("Sample predictions (expected ~{}x):", args.slope);
    for i in 0..predictions.len().min(5) {
        info!(
            "  x = {:.3} -> predicted {:.3}, actual {:.3}",
            test.features.row(i)[0],
            predictions[i],
            test.targets[i]
        );
    }

    let score = adapter.score(&test.features, &test.targets)?;
    info!("Test R²: {:.4}", score);

    Ok(())
}
