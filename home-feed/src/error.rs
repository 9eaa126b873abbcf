/// Error types for the home-feed core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] doc_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("controller unavailable: {0}")]
    Channel(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for page operations
pub type Result<T> = std::result::Result<T, AppError>;
