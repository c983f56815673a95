use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bytes on disk could not be decoded with the requested encoding.
    /// Recoverable: the caller may retry with another encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Content that must never be loaded, e.g. a template that is not UTF-8.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Recent history error: {0}")]
    Store(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl AppError {
    pub fn is_encoding(&self) -> bool {
        matches!(self, AppError::Encoding(_))
    }
}

/// Convenience type alias for Results with AppError
pub type Result<T> = std::result::Result<T, AppError>;
