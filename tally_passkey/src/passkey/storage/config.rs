use std::sync::LazyLock;

use crate::storage::DB_TABLE_PREFIX;

/// Passkey credentials table name
pub(crate) static DB_TABLE_PASSKEY_CREDENTIALS: LazyLock<String> = LazyLock::new(|| {
    std::env::var("DB_TABLE_PASSKEY_CREDENTIALS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "passkey_credentials"))
});

/// Ceremony challenge sessions table name
pub(crate) static DB_TABLE_CHALLENGE_SESSIONS: LazyLock<String> = LazyLock::new(|| {
    std::env::var("DB_TABLE_CHALLENGE_SESSIONS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "challenge_sessions"))
});
