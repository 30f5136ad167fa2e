//! One operator session: the loaded dataset, the last good model, and the
//! prediction log they write to.

use crate::config::SessionConfig;
use crate::predictor;
use log::{info, warn};
use lotguard_core::{LotError, LotResult};
use lotguard_data::{load_table, Table};
use lotguard_io::{summarize, Label, LogSummary, PredictionLog, PredictionTable};
use lotguard_linear::{LogisticRegression, TrainingTrace};
use lotguard_metrics::{accuracy, confusion_matrix, ConfusionMatrix};
use lotguard_preprocessing::{preprocess, StandardScaler};
use std::path::Path;

/// A fitted model together with the scaler its inputs must go through.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: LogisticRegression,
    pub scaler: StandardScaler,
    pub trace: TrainingTrace,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub trace: TrainingTrace,
    /// Step size actually used after capping the requested learning rate.
    pub step_size: f64,
    pub train_accuracy: f64,
    pub train_loss: f64,
    /// `None` when the split left no test rows.
    pub test_accuracy: Option<f64>,
    pub test_confusion: Option<ConfusionMatrix>,
    pub n_train: usize,
    pub n_test: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub labels: Vec<Label>,
    /// Set when the predictions could not be logged.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub table: Option<PredictionTable>,
    pub summary: LogSummary,
    pub warning: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    dataset: Option<Table>,
    trained: Option<TrainedModel>,
    log: PredictionLog,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let log = config.prediction_log();
        Session {
            config,
            dataset: None,
            trained: None,
            log,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&Table> {
        self.dataset.as_ref()
    }

    pub fn trained(&self) -> Option<&TrainedModel> {
        self.trained.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn log(&self) -> &PredictionLog {
        &self.log
    }

    /// Replace the dataset. On failure the previous one is kept.
    pub fn load_data(&mut self, path: impl AsRef<Path>) -> LotResult<&Table> {
        let table = load_table(path)?;
        Ok(self.set_dataset(table))
    }

    /// Use an already decoded table as the dataset.
    pub fn set_dataset(&mut self, table: Table) -> &Table {
        self.dataset.insert(table)
    }

    /// Preprocess the loaded dataset and fit a fresh model. The session's
    /// model is replaced only when every step succeeds.
    pub fn train(&mut self, learning_rate: f64, max_iter: usize) -> LotResult<TrainingReport> {
        let table = self
            .dataset
            .as_ref()
            .ok_or_else(|| LotError::model("no dataset loaded"))?;
        let data = preprocess(table, &self.config.preprocess_config())?;
        let run = self
            .config
            .trainer()
            .run(&data.x_train, &data.y_train, learning_rate, max_iter)?;

        let last = run
            .trace
            .last()
            .ok_or_else(|| LotError::model("training produced no iterations"))?;
        let (test_accuracy, test_confusion) = if data.y_test.numel() == 0 {
            (None, None)
        } else {
            let pred = run.model.predict(&data.x_test)?;
            (
                Some(accuracy(&data.y_test, &pred)?),
                Some(confusion_matrix(&data.y_test, &pred)?),
            )
        };
        let report = TrainingReport {
            trace: run.trace.clone(),
            step_size: run.step_size,
            train_accuracy: last.accuracy,
            train_loss: last.loss,
            test_accuracy,
            test_confusion,
            n_train: data.y_train.numel(),
            n_test: data.y_test.numel(),
        };
        if let Some(acc) = test_accuracy {
            info!("test accuracy {:.4} on {} rows", acc, report.n_test);
        }

        self.trained = Some(TrainedModel {
            model: run.model,
            scaler: data.scaler,
            trace: run.trace,
        });
        Ok(report)
    }

    /// Classify raw rows and append each one to the prediction log. A log
    /// failure does not fail the prediction; it is reported in `warning`.
    pub fn predict(&mut self, rows: &[Vec<f64>]) -> LotResult<PredictionOutcome> {
        let trained = self
            .trained
            .as_ref()
            .ok_or_else(|| LotError::model("no trained model; train one first"))?;
        let labels = predictor::predict(&trained.model, &trained.scaler, rows)?;

        let mut warning = None;
        for (row, &label) in rows.iter().zip(&labels) {
            if let Err(e) = self.log.append(row, label) {
                warn!("prediction not logged to {}: {e}", self.log.path().display());
                warning = Some(format!("prediction could not be saved to the log: {e}"));
                break;
            }
        }
        info!("predicted {} rows", labels.len());
        Ok(PredictionOutcome { labels, warning })
    }

    /// Everything logged so far with its summary. Read failures become a
    /// warning with an empty view.
    pub fn history(&self) -> HistoryView {
        match self.log.load_all() {
            Ok(table) => {
                let summary = table
                    .as_ref()
                    .map(|t| summarize(&t.records))
                    .unwrap_or_default();
                HistoryView { table, summary, warning: None }
            }
            Err(e) => {
                warn!("prediction log {} unreadable: {e}", self.log.path().display());
                HistoryView {
                    table: None,
                    summary: LogSummary::default(),
                    warning: Some(format!("prediction log could not be read: {e}")),
                }
            }
        }
    }

    /// Drop the dataset and model. The log file is left alone.
    pub fn end(&mut self) {
        self.dataset = None;
        self.trained = None;
        info!("session ended");
    }
}
