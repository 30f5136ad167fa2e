use lotguard_core::{LotError, LotResult, Tensor};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// A fitted scaler is immutable: the statistics and the column order they
/// belong to are fixed at `fit` time and reused for every later transform.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    columns: Vec<String>,
    mean: Tensor<f64>,
    std: Tensor<f64>,
}

impl StandardScaler {
    /// Compute per-column mean and population std from `x` (`[samples, features]`).
    pub fn fit(x: &Tensor<f64>, columns: &[String]) -> LotResult<Self> {
        if x.ndim() != 2 || x.ncols() != columns.len() {
            return Err(LotError::schema(format!(
                "scaler expects {} named columns, got matrix of shape {}",
                columns.len(),
                x.shape()
            )));
        }
        if x.nrows() == 0 {
            return Err(LotError::schema("cannot fit a scaler on zero rows"));
        }
        let mean = x.mean_axis(0)?;
        // Constant columns keep their scale.
        let std = x
            .std_axis(0)?
            .apply(|v| if v.abs() < f64::EPSILON { 1.0 } else { v });
        Ok(StandardScaler {
            columns: columns.to_vec(),
            mean,
            std,
        })
    }

    /// Fit and transform in one step.
    pub fn fit_transform(x: &Tensor<f64>, columns: &[String]) -> LotResult<(Self, Tensor<f64>)> {
        let scaler = Self::fit(x, columns)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }

    /// `(x - mean) / std`. Rows must have the fitted column count.
    pub fn transform(&self, x: &Tensor<f64>) -> LotResult<Tensor<f64>> {
        if x.ndim() != 2 || x.ncols() != self.n_features() {
            return Err(LotError::schema(format!(
                "expected rows with {} features ({}), got shape {}",
                self.n_features(),
                self.columns.join(", "),
                x.shape()
            )));
        }
        let centered = x.sub(&self.mean.unsqueeze(0)?)?;
        Ok(centered.div(&self.std.unsqueeze(0)?)?)
    }

    /// Columns this scaler was fit on, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn mean(&self) -> &[f64] {
        self.mean.data()
    }

    pub fn std(&self) -> &[f64] {
        self.std.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names() -> Vec<String> {
        vec!["Productos-Lote".to_string(), "Tiempo-Entrega".to_string()]
    }

    #[test]
    fn test_standard_scaler() {
        let x = Tensor::from_vec2d(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let (scaler, transformed) = StandardScaler::fit_transform(&x, &names()).unwrap();

        let mean = transformed.mean_axis(0).unwrap();
        let std = transformed.std_axis(0).unwrap();
        for j in 0..2 {
            assert!(mean.data()[j].abs() < 1e-10);
            assert_relative_eq!(std.data()[j], 1.0, epsilon = 1e-10);
        }
        assert_eq!(scaler.mean(), &[3.0, 4.0]);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let x = Tensor::from_vec2d(&[vec![7.0, 1.0], vec![7.0, 3.0]]).unwrap();
        let (scaler, transformed) = StandardScaler::fit_transform(&x, &names()).unwrap();
        assert_eq!(scaler.std()[0], 1.0);
        assert_eq!(transformed.col(0).unwrap().data(), &[0.0, 0.0]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let x = Tensor::from_vec2d(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let scaler = StandardScaler::fit(&x, &names()).unwrap();
        let wide = Tensor::from_vec2d(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(scaler.transform(&wide).unwrap_err().is_schema());
    }

    #[test]
    fn test_fit_rejects_empty() {
        let x = Tensor::<f64>::zeros(vec![0, 2]);
        assert!(StandardScaler::fit(&x, &names()).unwrap_err().is_schema());
    }
}
