mod errors;
mod storage;
mod types;

use std::{env, sync::LazyLock};

pub use errors::SessionError;
pub use storage::WebSessionStore;
pub use types::WebSession;

/// Cookie carrying the general-purpose web session established after a
/// successful login.
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Web session lifetime in seconds. Defaults to 24 hours.
pub(crate) static SESSION_COOKIE_MAX_AGE: LazyLock<i64> = LazyLock::new(|| {
    env::var("SESSION_COOKIE_MAX_AGE")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(86400)
});

pub(crate) async fn init() -> Result<(), SessionError> {
    WebSessionStore::init().await
}
