//! Error types for the exploration helpers

use thiserror::Error;

/// Result type alias for exploration operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for clustering, projection and plotting
#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error(
        "Cannot determine principal-component count: cumulative explained variance reached {reached:.4}, threshold is {threshold}"
    )]
    ComponentSelection { threshold: f64, reached: f64 },

    #[error("Degenerate linkage: {0}")]
    DegenerateLinkage(String),

    #[error("Dimensionality of color data not supported: {columns} columns (at most {max})")]
    UnsupportedColorDimensionality { columns: usize, max: usize },

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KolosalError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl std::fmt::Display,
        reason: &str,
    ) -> Self {
        KolosalError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn render(err: impl std::fmt::Display) -> Self {
        KolosalError::RenderError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
