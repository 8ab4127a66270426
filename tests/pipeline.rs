//! End-to-end runs on the built-in toy graph.

use candle_core::Device;
use rand::rngs::StdRng;
use rand::SeedableRng;

use fraud_gnn::config::{DerivedDimensions, Hyperparameters};
use fraud_gnn::datasets::{Dataset, Example};
use fraud_gnn::error::{Error, Stage};
use fraud_gnn::masks::SplitIndices;
use fraud_gnn::pipeline::{prepare, train};
use fraud_gnn::preprocess::{AdjacencyNorm, NormScheme};
use fraud_gnn::sparse::CooMatrix;

fn hyper(epochs: usize) -> Hyperparameters {
    Hyperparameters {
        epochs,
        hidden_dim: 8,
        learning_rate: 0.01,
        ..Default::default()
    }
}

#[test]
fn toy_graph_smoke_run() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(123);
    let raw = Example.load(&mut rng)?;
    let data = prepare(&raw, &AdjacencyNorm::default())?;
    let mut lines = Vec::new();
    let summary = train(&data, hyper(2), &Device::Cpu, &mut rng, &mut lines)?;

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Epoch: 0, "));
    assert!(lines[1].starts_with("Epoch: 1, "));
    assert!(lines[2].starts_with("test_loss: "));
    for report in &summary.epochs {
        assert!((0.0..=1.0).contains(&report.train_acc));
        assert!((0.0..=1.0).contains(&report.val_acc));
    }
    assert!((0.0..=1.0).contains(&summary.test.test_acc));
    Ok(())
}

#[test]
fn epoch_count_and_non_negative_losses() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let raw = Example.load(&mut rng)?;
    let norm = AdjacencyNorm {
        scheme: NormScheme::Symmetric,
        self_loops: true,
    };
    let data = prepare(&raw, &norm)?;
    let mut lines = Vec::new();
    let summary = train(&data, hyper(6), &Device::Cpu, &mut rng, &mut lines)?;

    assert_eq!(summary.epochs.len(), 6);
    assert_eq!(lines.iter().filter(|l| l.starts_with("Epoch: ")).count(), 6);
    assert_eq!(lines.iter().filter(|l| l.starts_with("test_loss: ")).count(), 1);
    for (i, report) in summary.epochs.iter().enumerate() {
        assert_eq!(report.epoch, i);
        assert!(report.train_loss >= 0.0);
        assert!(report.val_loss >= 0.0);
    }
    assert!(summary.test.test_loss >= 0.0);
    Ok(())
}

#[test]
fn runs_are_reproducible_for_a_seed() -> anyhow::Result<()> {
    let run = |seed| -> anyhow::Result<_> {
        let mut rng = StdRng::seed_from_u64(seed);
        let raw = Example.load(&mut rng)?;
        let data = prepare(&raw, &AdjacencyNorm::default())?;
        let mut lines = Vec::new();
        Ok(train(&data, hyper(3), &Device::Cpu, &mut rng, &mut lines)?)
    };
    assert_eq!(run(11)?, run(11)?);
    Ok(())
}

#[test]
fn derived_dimensions_follow_the_data() -> anyhow::Result<()> {
    let raw = Example.load(&mut StdRng::seed_from_u64(0))?;
    let data = prepare(&raw, &AdjacencyNorm::default())?;
    let dims = DerivedDimensions::from_data(&data)?;
    assert_eq!(dims.num_nodes, 4);
    assert_eq!(dims.input_dim, 2);
    assert_eq!(dims.output_dim, 2);
    assert_eq!(dims.class_size, 2);
    assert_eq!(dims.num_meta, 2);
    assert_eq!(dims.num_features_nonzero, 4);
    Ok(())
}

#[test]
fn overlapping_split_indices_fail_preprocessing() -> anyhow::Result<()> {
    let mut raw = Example.load(&mut StdRng::seed_from_u64(0))?;
    raw.splits = SplitIndices {
        train: vec![0, 1],
        val: vec![1],
        test: vec![3],
    };
    let err = prepare(&raw, &AdjacencyNorm::default()).unwrap_err();
    assert!(matches!(err, Error::SplitOverlap { node: 1, .. }));
    Ok(())
}

#[test]
fn out_of_range_split_index_fails() -> anyhow::Result<()> {
    let mut raw = Example.load(&mut StdRng::seed_from_u64(0))?;
    raw.splits.test = vec![4];
    let err = prepare(&raw, &AdjacencyNorm::default()).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 4, len: 4 }));
    Ok(())
}

#[test]
fn mismatched_adjacency_fails() -> anyhow::Result<()> {
    let mut raw = Example.load(&mut StdRng::seed_from_u64(0))?;
    raw.supports.push(CooMatrix::identity(5));
    let err = prepare(&raw, &AdjacencyNorm::default()).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    Ok(())
}

#[test]
fn stage_errors_name_the_stage() {
    let err = Error::Stage {
        stage: Stage::ForwardTrain,
        source: Box::new(Error::NumericFailure("train loss is NaN".into())),
    };
    assert_eq!(err.to_string(), "forward-train failed");
    let source = std::error::Error::source(&err).map(|e| e.to_string());
    assert_eq!(source.as_deref(), Some("non-finite value: train loss is NaN"));
}
