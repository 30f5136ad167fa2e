//! # LotGuard
//!
//! Classifies production batches as defective or not from their size and
//! delivery time, and keeps an append-only CSV record of every prediction.
//!
//! ## Modules
//!
//! - **core**: tensor storage and the shared `LotError` taxonomy
//! - **data**: CSV / Excel / JSON loading into a `Table`
//! - **preprocessing**: standard scaling and the seeded 70/30 split
//! - **metrics**: accuracy, log loss, confusion matrix
//! - **linear**: logistic regression and its warm-started SAGA trainer
//! - **io**: the prediction log
//! - [`predictor`], [`config`], [`session`]: the application layer

/// Tensor storage and error types.
pub use lotguard_core as core;

/// Tabular data loading.
pub use lotguard_data as data;

/// Scaling and splitting.
pub use lotguard_preprocessing as preprocessing;

/// Evaluation metrics.
pub use lotguard_metrics as metrics;

/// Logistic regression and training.
pub use lotguard_linear as linear;

/// Prediction log.
pub use lotguard_io as io;

pub mod config;
pub mod predictor;
pub mod session;

pub use config::SessionConfig;
pub use lotguard_core::{LotError, LotResult};
pub use lotguard_io::Label;
pub use session::{HistoryView, PredictionOutcome, Session, TrainingReport};
