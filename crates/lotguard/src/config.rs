use lotguard_core::{LotError, LotResult};
use lotguard_io::{PredictionLog, DEFAULT_FEATURE_NAMES};
use lotguard_linear::{Trainer, TrainingParams};
use lotguard_preprocessing::PreprocessConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a [`Session`](crate::Session) needs to know up front.
///
/// Every field has a default, so a JSON file only has to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub features: Vec<String>,
    pub label: String,
    pub test_ratio: f64,
    pub seed: u64,
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub log_path: PathBuf,
    /// Feature headers in the prediction log. When their count does not match
    /// `features`, the log falls back to `Variable 1..n`.
    pub log_feature_names: Vec<String>,
    pub learning_rate: f64,
    pub max_iter: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let prep = PreprocessConfig::default();
        let params = TrainingParams::default();
        SessionConfig {
            features: prep.features,
            label: prep.label,
            test_ratio: prep.test_ratio,
            seed: prep.seed,
            c: Trainer::default().c,
            log_path: PathBuf::from("registro_predicciones.csv"),
            log_feature_names: DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            learning_rate: params.learning_rate,
            max_iter: params.max_iter,
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> LotResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| LotError::format(format!("invalid config {}: {e}", path.display())))
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            features: self.features.clone(),
            label: self.label.clone(),
            test_ratio: self.test_ratio,
            seed: self.seed,
        }
    }

    pub fn trainer(&self) -> Trainer {
        Trainer::new(self.c, self.seed)
    }

    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            learning_rate: self.learning_rate,
            max_iter: self.max_iter,
        }
    }

    pub fn prediction_log(&self) -> PredictionLog {
        if self.log_feature_names.len() == self.features.len() {
            PredictionLog::new(self.log_path.clone(), self.log_feature_names.clone())
        } else {
            PredictionLog::generic(self.log_path.clone(), self.features.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lotguard.json");
        fs::write(&path, r#"{ "log_path": "out/log.csv", "max_iter": 200 }"#).unwrap();

        let cfg = SessionConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.max_iter, 200);
        assert_eq!(cfg.log_path, PathBuf::from("out/log.csv"));
        assert_eq!(cfg.label, "Defectuoso");
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.learning_rate, 0.01);
    }

    #[test]
    fn test_bad_json_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lotguard.json");
        fs::write(&path, "{ max_iter: ").unwrap();
        assert!(SessionConfig::from_json_file(&path).unwrap_err().is_format());
        assert!(SessionConfig::from_json_file(dir.path().join("nope.json")).unwrap_err().is_io());
    }

    #[test]
    fn test_log_headers_fall_back_to_generic() {
        let cfg = SessionConfig {
            features: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        assert_eq!(cfg.prediction_log().feature_names(), ["Variable 1", "Variable 2", "Variable 3"]);
        let default_log = SessionConfig::default().prediction_log();
        assert_eq!(default_log.feature_names(), ["Cantidad de Productos", "Tiempo de Entrega"]);
    }
}
