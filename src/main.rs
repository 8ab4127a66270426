use anyhow::Context;
use candle_core::Device;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use fraud_gnn::config::Args;
use fraud_gnn::datasets;
use fraud_gnn::pipeline;
use fraud_gnn::train::ConsoleReporter;

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// cargo run --release -- --dataset-str example --epochs 2
fn main() -> anyhow::Result<()> {
    // usage errors exit with status 2, failures during the run with status 1
    let args = Args::parse();
    setup_logging(&args.log_level);
    let hyper = args.hyperparameters()?;

    let device = Device::cuda_if_available(0)?;
    if device.is_cuda() {
        device.set_seed(hyper.seed)?;
    }
    let mut rng = StdRng::seed_from_u64(hyper.seed);
    info!(seed = hyper.seed, dataset = %args.dataset, ?device, "starting");
    if !hyper.batch_size_is_default() {
        warn!(batch_size = hyper.batch_size, "batch size is ignored by full-batch training");
    }

    let raw = datasets::load(args.dataset, &args.data_path, hyper.train_size, &mut rng)
        .with_context(|| format!("loading dataset {}", args.dataset))?;
    let data = pipeline::prepare(&raw, &hyper.adjacency).context("preprocessing")?;

    let mut reporter = ConsoleReporter::new(hyper.epochs)?;
    pipeline::train(&data, hyper, &device, &mut rng, &mut reporter).context("training")?;
    Ok(())
}
