use thiserror::Error;

use crate::utils::UtilError;

/// Errors raised while creating or resolving web sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
