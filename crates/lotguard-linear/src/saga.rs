use crate::logistic::{sigmoid, LogisticRegression};
use log::debug;
use lotguard_core::{LotError, LotResult, Tensor};
use lotguard_metrics::{accuracy, log_loss};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Solver settings. `c` is the inverse L2 regularization strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SagaConfig {
    pub learning_rate: f64,
    pub c: f64,
    pub seed: u64,
}

impl Default for SagaConfig {
    fn default() -> Self {
        SagaConfig {
            learning_rate: 0.01,
            c: 1.0,
            seed: 42,
        }
    }
}

/// Training-set quality of the current parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    pub iteration: usize,
    pub accuracy: f64,
    pub loss: f64,
}

/// Warm-started SAGA optimizer for L2-regularized logistic regression.
///
/// Each [`step`](SagaSolver::step) runs one epoch (`n` randomly sampled
/// updates) starting from the parameters left by the previous step. The
/// gradient memory is reset at the start of every epoch; the parameters and
/// the sampling RNG carry over.
#[derive(Debug)]
pub struct SagaSolver<'a> {
    x: &'a Tensor<f64>,
    y: &'a Tensor<f64>,
    model: LogisticRegression,
    step_size: f64,
    alpha: f64,
    rng: StdRng,
    iteration: usize,
}

impl<'a> SagaSolver<'a> {
    pub fn new(x: &'a Tensor<f64>, y: &'a Tensor<f64>, config: SagaConfig) -> LotResult<Self> {
        let n = x.nrows();
        if x.ndim() != 2 || n == 0 {
            return Err(LotError::model("training features must be a non-empty matrix"));
        }
        if y.numel() != n {
            return Err(LotError::model(format!(
                "{n} feature rows but {} labels",
                y.numel()
            )));
        }
        if x.data().iter().chain(y.data()).any(|v| !v.is_finite()) {
            return Err(LotError::model("training data contains NaN or infinite values"));
        }
        let has_neg = y.data().iter().any(|&v| v < 0.5);
        let has_pos = y.data().iter().any(|&v| v >= 0.5);
        if !(has_neg && has_pos) {
            return Err(LotError::model(
                "training labels need both classes (0 and 1); found only one",
            ));
        }
        if !(config.learning_rate.is_finite() && config.learning_rate > 0.0) {
            return Err(LotError::model(format!(
                "learning rate must be positive, got {}",
                config.learning_rate
            )));
        }
        if !(config.c.is_finite() && config.c > 0.0) {
            return Err(LotError::model(format!("C must be positive, got {}", config.c)));
        }

        let alpha = 1.0 / (config.c * n as f64);
        let bound = stable_step_bound(x, alpha)?;
        let step_size = config.learning_rate.min(bound);
        debug!(
            "saga: n={n} alpha={alpha:.6} step={step_size:.6} (requested {}, bound {bound:.6})",
            config.learning_rate
        );

        Ok(SagaSolver {
            x,
            y,
            model: LogisticRegression::zeros(x.ncols()),
            step_size,
            alpha,
            rng: StdRng::seed_from_u64(config.seed),
            iteration: 0,
        })
    }

    /// Step size actually used: the learning rate, capped at the stability bound.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn model(&self) -> &LogisticRegression {
        &self.model
    }

    pub fn into_model(self) -> LogisticRegression {
        self.model
    }

    /// Run one more epoch on top of the accumulated parameters.
    pub fn step(&mut self) -> LotResult<()> {
        let (x, labels) = (self.x, self.y.data());
        let (n, p) = (x.nrows(), x.ncols());
        let step = self.step_size;

        let mut memory = vec![0.0; n];
        let mut seen = vec![false; n];
        let mut n_seen = 0usize;
        let mut grad_sum = vec![0.0; p];
        let mut bias_sum = 0.0;

        let shrink = 1.0 / (1.0 + step * self.alpha);
        for _ in 0..n {
            let i = self.rng.gen_range(0..n);
            let row = x.row(i)?;
            let g = sigmoid(self.model.score_row(row)) - labels[i];
            let delta = g - memory[i];
            memory[i] = g;
            if !seen[i] {
                seen[i] = true;
                n_seen += 1;
            }
            let denom = n_seen as f64;

            let (weights, bias) = self.model.params_mut();
            for j in 0..p {
                grad_sum[j] += delta * row[j];
                weights[j] -= step * (delta * row[j] + grad_sum[j] / denom);
                // L2 proximal step; the intercept is not penalized
                weights[j] *= shrink;
            }
            bias_sum += delta;
            *bias -= step * (delta + bias_sum / denom);
        }

        self.iteration += 1;
        Ok(())
    }

    /// Accuracy and log loss of the current parameters on the training set.
    pub fn metrics(&self) -> LotResult<StepMetrics> {
        let proba = self.model.predict_proba(self.x)?;
        let pred = proba.apply(|v| if v >= 0.5 { 1.0 } else { 0.0 });
        Ok(StepMetrics {
            iteration: self.iteration,
            accuracy: accuracy(self.y, &pred)?,
            loss: log_loss(self.y, &proba)?,
        })
    }
}

/// `1 / (2L + mu)`, with `L` the Lipschitz constant of the per-sample log-loss
/// gradient (intercept included) plus the L2 term.
fn stable_step_bound(x: &Tensor<f64>, alpha: f64) -> LotResult<f64> {
    let mut max_sq = 0.0_f64;
    for i in 0..x.nrows() {
        let sq: f64 = x.row(i)?.iter().map(|v| v * v).sum();
        max_sq = max_sq.max(sq);
    }
    let lipschitz = 0.25 * (max_sq + 1.0) + alpha;
    let mu = (2.0 * x.nrows() as f64 * alpha).min(lipschitz);
    Ok(1.0 / (2.0 * lipschitz + mu))
}
