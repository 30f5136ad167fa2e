use thiserror::Error;

/// Low-level errors raised by tensor construction and indexing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Invalid axis: {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Cannot broadcast shapes {a:?} and {b:?}")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type TensorResult<T> = Result<T, TensorError>;

/// Error taxonomy shared by every LotGuard crate.
///
/// Loader, preprocessor and trainer failures surface as one of these and never
/// leave session state half-updated.
#[derive(Debug, Error)]
pub enum LotError {
    /// A required column is absent or holds values of the wrong kind.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The input file is of an unsupported type or could not be decoded.
    #[error("Format error: {0}")]
    Format(String),

    /// Training data is degenerate or the model is not usable.
    #[error("Model error: {0}")]
    Model(String),

    /// The prediction log (or an input file) could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl LotError {
    pub fn schema(msg: impl Into<String>) -> Self {
        LotError::Schema(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        LotError::Format(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        LotError::Model(msg.into())
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, LotError::Schema(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, LotError::Format(_))
    }

    pub fn is_model(&self) -> bool {
        matches!(self, LotError::Model(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, LotError::Io(_))
    }
}

pub type LotResult<T> = Result<T, LotError>;
