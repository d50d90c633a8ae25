//! Error-to-response mapping with the anti-oracle policy: the client
//! learns only that a ceremony failed, never which check tripped. The
//! two exceptions carry no forgeable signal and pass through verbatim:
//! `NoCredentials` (the login page needs it to fall back to another
//! method) and `TooManyCredentials`.

use http::StatusCode;
use tally_passkey::PasskeyError;

pub(crate) fn registration_error_response(err: &PasskeyError) -> (StatusCode, String) {
    match err {
        PasskeyError::TooManyCredentials => (StatusCode::BAD_REQUEST, err.to_string()),
        PasskeyError::Storage(_) | PasskeyError::Config(_) | PasskeyError::Utils(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration failed".to_string(),
        ),
        _ => (StatusCode::BAD_REQUEST, "Registration failed".to_string()),
    }
}

pub(crate) fn authentication_error_response(err: &PasskeyError) -> (StatusCode, String) {
    match err {
        PasskeyError::NoCredentials => (StatusCode::BAD_REQUEST, "No passkeys registered".to_string()),
        PasskeyError::Storage(_) | PasskeyError::Config(_) | PasskeyError::Utils(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication failed".to_string(),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            "Authentication failed".to_string(),
        ),
    }
}

pub(crate) fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    tracing::error!("internal error: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
