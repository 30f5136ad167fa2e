use crate::scaler::StandardScaler;
use crate::split::{train_test_split, SplitIndices};
use log::info;
use lotguard_core::{LotError, LotResult, Tensor};
use lotguard_data::Table;

/// Which columns feed the model and how rows are partitioned.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub features: Vec<String>,
    pub label: String,
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            features: vec!["Productos-Lote".to_string(), "Tiempo-Entrega".to_string()],
            label: "Defectuoso".to_string(),
            test_ratio: 0.3,
            seed: 42,
        }
    }
}

/// Standardized partitions plus the scaler that produced them.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub x_train: Tensor<f64>,
    pub x_test: Tensor<f64>,
    pub y_train: Tensor<f64>,
    pub y_test: Tensor<f64>,
    pub scaler: StandardScaler,
    pub split: SplitIndices,
}

/// Select predictors and label, standardize, then split.
///
/// The scaler is fit on every row of the input before the split, so the test
/// partition's statistics contribute to the scaling.
pub fn preprocess(table: &Table, config: &PreprocessConfig) -> LotResult<Preprocessed> {
    for name in config.features.iter().chain(std::iter::once(&config.label)) {
        table.require_column(name)?;
    }
    if table.is_empty() {
        return Err(LotError::schema("dataset has no rows"));
    }

    let x = table.numeric_matrix(&config.features)?;
    let labels = table.numeric_column(&config.label)?;
    if let Some(bad) = labels.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(LotError::schema(format!(
            "label column '{}' must be binary (0/1), found {bad}",
            config.label
        )));
    }
    let y = Tensor::from_slice(&labels);

    let (scaler, x_scaled) = StandardScaler::fit_transform(&x, &config.features)?;
    let split = train_test_split(&x_scaled, &y, config.test_ratio, config.seed)?;
    info!(
        "preprocessed {} rows: {} train / {} test",
        table.nrows(),
        split.indices.train.len(),
        split.indices.test.len()
    );

    Ok(Preprocessed {
        x_train: split.x_train,
        x_test: split.x_test,
        y_train: split.y_train,
        y_test: split.y_test,
        scaler,
        split: split.indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hundred_lots() -> Table {
        let productos: Vec<f64> = (0..100).map(|i| 10.0 + i as f64).collect();
        let tiempo: Vec<f64> = (0..100).map(|i| 5.0 + (i % 17) as f64).collect();
        let defectuoso: Vec<f64> = (0..100).map(|i| (i % 3 == 0) as u8 as f64).collect();
        Table::from_columns(vec![
            ("Productos-Lote", productos),
            ("Tiempo-Entrega", tiempo),
            ("Defectuoso", defectuoso),
        ])
        .unwrap()
    }

    #[test]
    fn test_seventy_thirty_partition() {
        let table = hundred_lots();
        let out = preprocess(&table, &PreprocessConfig::default()).unwrap();
        assert_eq!(out.x_train.nrows(), 70);
        assert_eq!(out.x_test.nrows(), 30);
        assert_eq!(out.y_train.numel(), 70);
        assert_eq!(out.y_test.numel(), 30);
    }

    #[test]
    fn test_partitions_reconstruct_labels() {
        let table = hundred_lots();
        let original = table.numeric_column("Defectuoso").unwrap();
        let out = preprocess(&table, &PreprocessConfig::default()).unwrap();

        let mut rebuilt = vec![f64::NAN; original.len()];
        for (pos, &row) in out.split.train.iter().enumerate() {
            rebuilt[row] = out.y_train.data()[pos];
        }
        for (pos, &row) in out.split.test.iter().enumerate() {
            rebuilt[row] = out.y_test.data()[pos];
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_scaler_sees_all_rows() {
        let table = hundred_lots();
        let out = preprocess(&table, &PreprocessConfig::default()).unwrap();
        // mean of 10..=109
        assert!((out.scaler.mean()[0] - 59.5).abs() < 1e-10);
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let table = Table::from_columns(vec![
            ("Productos-Lote", vec![10.0, 20.0]),
            ("Tiempo-Entrega", vec![5.0, 10.0]),
        ])
        .unwrap();
        let err = preprocess(&table, &PreprocessConfig::default()).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("Defectuoso"));
    }

    #[test]
    fn test_non_binary_label_is_schema_error() {
        let table = Table::from_columns(vec![
            ("Productos-Lote", vec![10.0, 20.0]),
            ("Tiempo-Entrega", vec![5.0, 10.0]),
            ("Defectuoso", vec![0.0, 2.0]),
        ])
        .unwrap();
        assert!(preprocess(&table, &PreprocessConfig::default()).unwrap_err().is_schema());
    }

    #[test]
    fn test_non_finite_predictor_is_schema_error() {
        let table = Table::from_columns(vec![
            ("Productos-Lote", vec![10.0, f64::NAN, 30.0, 40.0]),
            ("Tiempo-Entrega", vec![5.0, 10.0, 15.0, f64::INFINITY]),
            ("Defectuoso", vec![0.0, 0.0, 1.0, 1.0]),
        ])
        .unwrap();
        let err = preprocess(&table, &PreprocessConfig::default()).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("Productos-Lote"));
    }
}
