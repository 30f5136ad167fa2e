use crate::logistic::LogisticRegression;
use crate::saga::{SagaConfig, SagaSolver, StepMetrics};
use log::{debug, info};
use lotguard_core::{LotError, LotResult, Tensor};
use std::ops::RangeInclusive;

/// Learning rates the interactive shell offers.
pub const LEARNING_RATE_RANGE: RangeInclusive<f64> = 0.001..=1.0;
/// Iteration counts the interactive shell offers.
pub const MAX_ITER_RANGE: RangeInclusive<usize> = 100..=10_000;

/// Hyperparameters chosen by the user for one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub max_iter: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        TrainingParams {
            learning_rate: 0.01,
            max_iter: 1000,
        }
    }
}

impl TrainingParams {
    /// Check the values against the ranges exposed by the shell.
    pub fn validate(&self) -> LotResult<()> {
        if !LEARNING_RATE_RANGE.contains(&self.learning_rate) {
            return Err(LotError::model(format!(
                "learning rate {} outside [{}, {}]",
                self.learning_rate,
                LEARNING_RATE_RANGE.start(),
                LEARNING_RATE_RANGE.end()
            )));
        }
        if !MAX_ITER_RANGE.contains(&self.max_iter) {
            return Err(LotError::model(format!(
                "max iterations {} outside [{}, {}]",
                self.max_iter,
                MAX_ITER_RANGE.start(),
                MAX_ITER_RANGE.end()
            )));
        }
        Ok(())
    }
}

/// Per-step history of one training run: `iterations[k]`, `accuracies[k]`
/// and `losses[k]` describe the model after step `k + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingTrace {
    pub iterations: Vec<usize>,
    pub accuracies: Vec<f64>,
    pub losses: Vec<f64>,
}

impl TrainingTrace {
    pub fn with_capacity(n: usize) -> Self {
        TrainingTrace {
            iterations: Vec::with_capacity(n),
            accuracies: Vec::with_capacity(n),
            losses: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, m: StepMetrics) {
        self.iterations.push(m.iteration);
        self.accuracies.push(m.accuracy);
        self.losses.push(m.loss);
    }

    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    pub fn last(&self) -> Option<StepMetrics> {
        let k = self.len().checked_sub(1)?;
        Some(StepMetrics {
            iteration: self.iterations[k],
            accuracy: self.accuracies[k],
            loss: self.losses[k],
        })
    }
}

/// A fitted model and how it got there.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub model: LogisticRegression,
    pub trace: TrainingTrace,
    /// Step size the solver used after capping the requested learning rate.
    pub step_size: f64,
}

/// Drives a [`SagaSolver`] for a fixed number of warm-started steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trainer {
    pub c: f64,
    pub seed: u64,
}

impl Default for Trainer {
    fn default() -> Self {
        let cfg = SagaConfig::default();
        Trainer { c: cfg.c, seed: cfg.seed }
    }
}

impl Trainer {
    pub fn new(c: f64, seed: u64) -> Self {
        Trainer { c, seed }
    }

    /// Perform exactly `max_iter` solver steps on `(x, y)`, scoring the model
    /// on the training set after each one.
    pub fn run(
        &self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        learning_rate: f64,
        max_iter: usize,
    ) -> LotResult<TrainingRun> {
        if max_iter == 0 {
            return Err(LotError::model("max iterations must be at least 1"));
        }
        let config = SagaConfig {
            learning_rate,
            c: self.c,
            seed: self.seed,
        };
        let mut solver = SagaSolver::new(x, y, config)?;
        let mut trace = TrainingTrace::with_capacity(max_iter);

        for _ in 0..max_iter {
            solver.step()?;
            let m = solver.metrics()?;
            debug!("iteration {}: accuracy={:.4} loss={:.6}", m.iteration, m.accuracy, m.loss);
            trace.push(m);
        }

        if let Some(last) = trace.last() {
            info!(
                "trained on {} rows for {} iterations: accuracy={:.4} loss={:.6}",
                x.nrows(),
                max_iter,
                last.accuracy,
                last.loss
            );
        }
        let step_size = solver.step_size();
        Ok(TrainingRun {
            model: solver.into_model(),
            trace,
            step_size,
        })
    }
}
