//! The epoch loop: forward, backward, Adam update, validation, report; then a
//! single test pass.

use std::fmt;

use candle_core::Tensor;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::Hyperparameters;
use crate::error::{Error, Result, Stage};
use crate::models::{FraudModel, ModelInputs};
use crate::utils::finite_scalar;

/// Node indices (u32 tensors) of each split.
#[derive(Clone, Debug)]
pub struct MaskIndices {
    pub train: Tensor,
    pub val: Tensor,
    pub test: Tensor,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_loss: f32,
    pub train_acc: f32,
    pub val_loss: f32,
    pub val_acc: f32,
}
impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Epoch: {}, train_loss: {:.4}, train_acc: {:.4}, val_loss: {:.4}, val_acc: {:.4}",
            self.epoch, self.train_loss, self.train_acc, self.val_loss, self.val_acc
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TestReport {
    pub test_loss: f32,
    pub test_acc: f32,
}
impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "test_loss: {:.4}, test_acc: {:.4}",
            self.test_loss, self.test_acc
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub epochs: Vec<EpochReport>,
    pub test: TestReport,
}

pub trait Reporter {
    fn epoch(&mut self, report: &EpochReport);
    fn test(&mut self, report: &TestReport);
}

/// Collects the report lines.
impl Reporter for Vec<String> {
    fn epoch(&mut self, report: &EpochReport) {
        self.push(report.to_string());
    }
    fn test(&mut self, report: &TestReport) {
        self.push(report.to_string());
    }
}

/// Prints report lines above an epoch progress bar.
pub struct ConsoleReporter {
    pbar: ProgressBar,
}
impl ConsoleReporter {
    pub fn new(epochs: usize) -> anyhow::Result<Self> {
        let pbar = ProgressBar::new(epochs as u64);
        pbar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} epochs ({per_sec}, {eta})")?
                .progress_chars("#>-"),
        );
        Ok(Self { pbar })
    }
}
impl Reporter for ConsoleReporter {
    fn epoch(&mut self, report: &EpochReport) {
        self.pbar.println(report.to_string());
        self.pbar.inc(1);
    }
    fn test(&mut self, report: &TestReport) {
        self.pbar.finish_and_clear();
        println!("{report}");
    }
}

fn staged<T, E: Into<Error>>(result: std::result::Result<T, E>, stage: Stage) -> Result<T> {
    result.map_err(|e| e.into().in_stage(stage))
}

pub struct Trainer<'a, M> {
    model: &'a mut M,
    optimizer: AdamW,
    epochs: usize,
}
impl<'a, M: FraudModel> Trainer<'a, M> {
    /// Adam with `momentum` as the first moment decay. Weight decay is part of
    /// the model loss, so the optimizer applies none.
    pub fn new(model: &'a mut M, hyper: &Hyperparameters) -> Result<Self> {
        let params = ParamsAdamW {
            lr: hyper.learning_rate,
            beta1: hyper.momentum,
            beta2: 0.999,
            eps: 1e-7,
            weight_decay: 0.0,
        };
        let optimizer = AdamW::new(model.parameters(), params)?;
        Ok(Self {
            model,
            optimizer,
            epochs: hyper.epochs,
        })
    }

    /// FORWARD_TRAIN, BACKWARD and UPDATE. Only this loss is ever differentiated.
    fn train_step(&mut self, inputs: &ModelInputs, mask: &Tensor) -> Result<(f32, f32)> {
        let stage = Stage::ForwardTrain;
        let output = staged(self.model.forward_t(inputs, mask, true), stage)?;
        let loss = staged(finite_scalar(&output.loss, "train loss"), stage)?;
        let acc = staged(finite_scalar(&output.accuracy, "train accuracy"), stage)?;

        let grads = staged(output.loss.backward(), Stage::Backward)?;
        staged(self.optimizer.step(&grads), Stage::Update)?;
        Ok((loss, acc))
    }

    fn evaluate(&mut self, inputs: &ModelInputs, mask: &Tensor, stage: Stage) -> Result<(f32, f32)> {
        let output = staged(self.model.forward_t(inputs, mask, false), stage)?;
        let loss = staged(finite_scalar(&output.loss, "loss"), stage)?;
        let acc = staged(finite_scalar(&output.accuracy, "accuracy"), stage)?;
        Ok((loss, acc))
    }

    pub fn run<R: Reporter>(
        &mut self,
        inputs: &ModelInputs,
        masks: &MaskIndices,
        reporter: &mut R,
    ) -> Result<RunSummary> {
        info!(epochs = self.epochs, lr = self.optimizer.learning_rate(), "training");
        let mut epochs = Vec::with_capacity(self.epochs);
        for epoch in 0..self.epochs {
            let (train_loss, train_acc) = self.train_step(inputs, &masks.train)?;
            let (val_loss, val_acc) = self.evaluate(inputs, &masks.val, Stage::ForwardVal)?;
            let report = EpochReport {
                epoch,
                train_loss,
                train_acc,
                val_loss,
                val_acc,
            };
            debug!(epoch, train_loss, train_acc, val_loss, val_acc, "epoch done");
            reporter.epoch(&report);
            epochs.push(report);
        }

        let (test_loss, test_acc) = self.evaluate(inputs, &masks.test, Stage::ForwardTest)?;
        let test = TestReport {
            test_loss,
            test_acc,
        };
        info!(test_loss, test_acc, "test");
        reporter.test(&test);
        Ok(RunSummary { epochs, test })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelOutput;
    use crate::sparse::CooMatrix;
    use candle_core::{Device, Var};

    /// Loss `(w - 3)^2`, with an extra parameter that never sees a gradient.
    struct Quadratic {
        w: Var,
        unused: Var,
        fail_eval: bool,
    }
    impl FraudModel for Quadratic {
        fn forward_t(
            &mut self,
            _inputs: &ModelInputs,
            _mask: &Tensor,
            train: bool,
        ) -> candle_core::Result<ModelOutput> {
            if self.fail_eval && !train {
                candle_core::bail!("shape mismatch in forward");
            }
            let loss = (self.w.as_tensor() - 3.0)?.sqr()?.sum_all()?;
            let accuracy = Tensor::new(0.5f32, self.w.device())?;
            Ok(ModelOutput { loss, accuracy })
        }
        fn parameters(&self) -> Vec<Var> {
            vec![self.w.clone(), self.unused.clone()]
        }
    }

    fn fixture() -> anyhow::Result<(Quadratic, ModelInputs, MaskIndices)> {
        let device = Device::Cpu;
        let model = Quadratic {
            w: Var::new(&[0f32], &device)?,
            unused: Var::new(&[7f32], &device)?,
            fail_eval: false,
        };
        let support = CooMatrix::identity(1).to_sparse()?.to_device(&device)?;
        let inputs = ModelInputs {
            supports: vec![support.clone()],
            features: support,
            labels: Tensor::new(&[[1f32]], &device)?,
        };
        let index = Tensor::new(&[0u32], &device)?;
        let masks = MaskIndices {
            train: index.clone(),
            val: index.clone(),
            test: index,
        };
        Ok((model, inputs, masks))
    }

    #[test]
    fn reports_every_epoch_and_one_test() -> anyhow::Result<()> {
        let (mut model, inputs, masks) = fixture()?;
        let hyper = Hyperparameters {
            epochs: 5,
            learning_rate: 0.1,
            ..Default::default()
        };
        let mut lines = Vec::new();
        let summary = Trainer::new(&mut model, &hyper)?.run(&inputs, &masks, &mut lines)?;
        assert_eq!(summary.epochs.len(), 5);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Epoch: 0, train_loss: 9.0000"));
        assert!(lines[5].starts_with("test_loss: "));
        // the loss decreases under Adam and the idle parameter is left alone
        assert!(summary.epochs[4].train_loss < summary.epochs[0].train_loss);
        assert_eq!(model.unused.to_vec1::<f32>()?, vec![7.0]);
        Ok(())
    }

    #[test]
    fn validation_does_not_move_parameters() -> anyhow::Result<()> {
        let (mut model, inputs, masks) = fixture()?;
        let hyper = Hyperparameters {
            epochs: 1,
            ..Default::default()
        };
        let mut lines = Vec::new();
        let summary = Trainer::new(&mut model, &hyper)?.run(&inputs, &masks, &mut lines)?;
        // one update happened before validation, none after
        let w = model.w.to_vec1::<f32>()?[0];
        let expected = (w - 3.0).powi(2);
        assert!((summary.epochs[0].val_loss - expected).abs() < 1e-5);
        assert!((summary.test.test_loss - expected).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn forward_failure_aborts_with_stage() -> anyhow::Result<()> {
        let (mut model, inputs, masks) = fixture()?;
        model.fail_eval = true;
        let mut lines = Vec::new();
        let err = Trainer::new(&mut model, &Hyperparameters::default())?
            .run(&inputs, &masks, &mut lines)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Stage {
                stage: Stage::ForwardVal,
                ..
            }
        ));
        assert!(lines.is_empty());
        Ok(())
    }

    #[test]
    fn console_reporter_counts_epochs() -> anyhow::Result<()> {
        let mut reporter = ConsoleReporter::new(2)?;
        assert_eq!(reporter.pbar.length(), Some(2));
        reporter.epoch(&EpochReport {
            epoch: 0,
            train_loss: 1.0,
            train_acc: 0.5,
            val_loss: 1.0,
            val_acc: 0.5,
        });
        assert_eq!(reporter.pbar.position(), 1);
        Ok(())
    }

    #[test]
    fn report_lines_use_four_decimals() {
        let report = EpochReport {
            epoch: 3,
            train_loss: 0.5,
            train_acc: 1.0,
            val_loss: 0.25,
            val_acc: 0.0,
        };
        assert_eq!(
            report.to_string(),
            "Epoch: 3, train_loss: 0.5000, train_acc: 1.0000, val_loss: 0.2500, val_acc: 0.0000"
        );
        let test = TestReport {
            test_loss: 1.0,
            test_acc: 0.75,
        };
        assert_eq!(test.to_string(), "test_loss: 1.0000, test_acc: 0.7500");
    }
}
