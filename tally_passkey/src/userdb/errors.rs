use thiserror::Error;

/// Errors raised by user lookup and persistence.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}
