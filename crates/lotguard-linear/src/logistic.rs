use lotguard_core::{LotError, LotResult, Tensor};
use serde::{Deserialize, Serialize};

/// Binary logistic regression: `p(defective | x) = sigmoid(w·x + b)`.
///
/// Parameters are only ever produced by a solver; a model that exists is a
/// fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    /// All-zero model, the starting point of a fresh solver.
    pub fn zeros(n_features: usize) -> Self {
        LogisticRegression {
            weights: vec![0.0; n_features],
            bias: 0.0,
        }
    }

    pub fn from_parts(weights: Vec<f64>, bias: f64) -> Self {
        LogisticRegression { weights, bias }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub(crate) fn params_mut(&mut self) -> (&mut [f64], &mut f64) {
        (&mut self.weights, &mut self.bias)
    }

    /// Raw score `w·x + b` for a single row.
    pub fn score_row(&self, row: &[f64]) -> f64 {
        self.weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + self.bias
    }

    fn check_width(&self, x: &Tensor<f64>) -> LotResult<()> {
        if x.ndim() != 2 || x.ncols() != self.n_features() {
            return Err(LotError::schema(format!(
                "model expects {} features, got shape {}",
                self.n_features(),
                x.shape()
            )));
        }
        Ok(())
    }

    /// Probability of class 1 for each row.
    pub fn predict_proba(&self, x: &Tensor<f64>) -> LotResult<Tensor<f64>> {
        self.check_width(x)?;
        let proba = (0..x.nrows())
            .map(|i| x.row(i).map(|row| sigmoid(self.score_row(row))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tensor::from_slice(&proba))
    }

    /// Class labels (threshold = 0.5).
    pub fn predict(&self, x: &Tensor<f64>) -> LotResult<Tensor<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}
