//! Stateless classification of new batches with a fitted model and scaler.

use lotguard_core::{LotError, LotResult, Tensor};
use lotguard_data::Table;
use lotguard_io::Label;
use lotguard_linear::LogisticRegression;
use lotguard_preprocessing::StandardScaler;

fn to_matrix(scaler: &StandardScaler, rows: &[Vec<f64>]) -> LotResult<Tensor<f64>> {
    let width = scaler.n_features();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(LotError::schema(format!(
            "row {i} has {} values, expected {width} ({})",
            row.len(),
            scaler.columns().join(", ")
        )));
    }
    for (i, row) in rows.iter().enumerate() {
        if let Some((j, v)) = row.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(LotError::schema(format!(
                "row {i}: '{}' must be finite, got {v}",
                scaler.columns()[j]
            )));
        }
    }
    Ok(Tensor::from_vec2d(rows)?)
}

fn check_pair(model: &LogisticRegression, scaler: &StandardScaler) -> LotResult<()> {
    if model.n_features() != scaler.n_features() {
        return Err(LotError::model(format!(
            "model has {} weights but scaler has {} columns",
            model.n_features(),
            scaler.n_features()
        )));
    }
    Ok(())
}

/// Probability that each raw (unscaled) row is defective.
pub fn predict_proba(
    model: &LogisticRegression,
    scaler: &StandardScaler,
    rows: &[Vec<f64>],
) -> LotResult<Vec<f64>> {
    check_pair(model, scaler)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let x = scaler.transform(&to_matrix(scaler, rows)?)?;
    Ok(model.predict_proba(&x)?.into_data())
}

/// Standardize `rows` with the scaler's stored statistics and classify them.
/// Does not touch the model, the scaler or the prediction log.
pub fn predict(
    model: &LogisticRegression,
    scaler: &StandardScaler,
    rows: &[Vec<f64>],
) -> LotResult<Vec<Label>> {
    Ok(predict_proba(model, scaler, rows)?
        .into_iter()
        .map(Label::from_prediction)
        .collect())
}

/// Classify every row of `table`, picking the scaler's columns by name.
pub fn predict_table(
    model: &LogisticRegression,
    scaler: &StandardScaler,
    table: &Table,
) -> LotResult<Vec<Label>> {
    check_pair(model, scaler)?;
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let x = scaler.transform(&table.numeric_matrix(scaler.columns())?)?;
    Ok(model
        .predict(&x)?
        .data()
        .iter()
        .map(|&v| Label::from_prediction(v))
        .collect())
}
