use thiserror::Error;

/// Errors raised by the generic data-store layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported database type: {0}")]
    UnsupportedType(String),
}
