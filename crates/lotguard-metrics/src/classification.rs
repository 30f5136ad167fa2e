use lotguard_core::{LotError, LotResult, Tensor};

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logs.
const EPS: f64 = 1e-15;

fn check_lengths(y_true: &Tensor<f64>, other: &Tensor<f64>) -> LotResult<usize> {
    let n = y_true.numel();
    if n != other.numel() {
        return Err(LotError::model(format!(
            "length mismatch: {n} labels vs {} predictions",
            other.numel()
        )));
    }
    if n == 0 {
        return Err(LotError::model("cannot score an empty label set"));
    }
    Ok(n)
}

/// Fraction of correct predictions, in [0, 1].
pub fn accuracy(y_true: &Tensor<f64>, y_pred: &Tensor<f64>) -> LotResult<f64> {
    let n = check_lengths(y_true, y_pred)?;
    let correct = y_true
        .data()
        .iter()
        .zip(y_pred.data())
        .filter(|(&a, &b)| (a - b).abs() < 0.5)
        .count();
    Ok(correct as f64 / n as f64)
}

/// Binary log loss: `-mean(y * ln(p) + (1 - y) * ln(1 - p))`, where `p` is
/// the probability of class 1.
pub fn log_loss(y_true: &Tensor<f64>, y_proba: &Tensor<f64>) -> LotResult<f64> {
    let n = check_lengths(y_true, y_proba)?;
    let total: f64 = y_true
        .data()
        .iter()
        .zip(y_proba.data())
        .map(|(&y, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    Ok(total / n as f64)
}

/// 2x2 confusion counts with class 1 ("defective") as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Share of predicted-defective rows that really were defective.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// Share of defective rows the model caught.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn confusion_matrix(y_true: &Tensor<f64>, y_pred: &Tensor<f64>) -> LotResult<ConfusionMatrix> {
    check_lengths(y_true, y_pred)?;
    let mut cm = ConfusionMatrix::default();
    for (&t, &p) in y_true.data().iter().zip(y_pred.data()) {
        match (t >= 0.5, p >= 0.5) {
            (false, false) => cm.true_negative += 1,
            (false, true) => cm.false_positive += 1,
            (true, false) => cm.false_negative += 1,
            (true, true) => cm.true_positive += 1,
        }
    }
    Ok(cm)
}
