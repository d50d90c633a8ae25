mod postgres;
mod sqlite;

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};

use crate::storage::{DB_TABLE_PREFIX, GENERIC_DATA_STORE};
use crate::utils::gen_session_id;

use super::SESSION_COOKIE_MAX_AGE;
use super::errors::SessionError;
use super::types::WebSession;

/// Web sessions table name
pub(crate) static DB_TABLE_WEB_SESSIONS: LazyLock<String> = LazyLock::new(|| {
    std::env::var("DB_TABLE_WEB_SESSIONS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "web_sessions"))
});

pub struct WebSessionStore;

impl WebSessionStore {
    pub(crate) async fn init() -> Result<(), SessionError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_tables_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_tables_postgres(pool).await
        } else {
            Err(SessionError::Storage("Unsupported database type".into()))
        }
    }

    /// Mint a fresh session for the user and persist it.
    pub async fn create_web_session(user_id: i64) -> Result<WebSession, SessionError> {
        let now = Utc::now();
        let session = WebSession {
            id: gen_session_id()?,
            user_id,
            expires_at: now + Duration::seconds(*SESSION_COOKIE_MAX_AGE),
            created_at: now,
        };

        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_session_sqlite(pool, &session).await?;
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_session_postgres(pool, &session).await?;
        } else {
            return Err(SessionError::Storage("Unsupported database type".into()));
        }
        Ok(session)
    }

    /// Plain lookup; callers decide what an expired session means.
    pub async fn get_web_session(session_id: &str) -> Result<Option<WebSession>, SessionError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_session_sqlite(pool, session_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_session_postgres(pool, session_id).await
        } else {
            Err(SessionError::Storage("Unsupported database type".into()))
        }
    }

    pub async fn delete_web_session(session_id: &str) -> Result<(), SessionError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::delete_session_sqlite(pool, session_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::delete_session_postgres(pool, session_id).await
        } else {
            Err(SessionError::Storage("Unsupported database type".into()))
        }
    }

    /// Storage hygiene; run from a scheduler, not required for correctness.
    pub async fn delete_expired_web_sessions(now: DateTime<Utc>) -> Result<u64, SessionError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::delete_expired_sessions_sqlite(pool, now).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::delete_expired_sessions_postgres(pool, now).await
        } else {
            Err(SessionError::Storage("Unsupported database type".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_environment;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_create_get_delete_web_session() {
        init_test_environment().await;

        let session = WebSessionStore::create_web_session(42).await.unwrap();
        assert_eq!(session.id.len(), 64);
        assert!(session.is_valid(Utc::now()));

        let loaded = WebSessionStore::get_web_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.user_id, 42);

        WebSessionStore::delete_web_session(&session.id)
            .await
            .unwrap();
        assert!(
            WebSessionStore::get_web_session(&session.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_expired_sweep_only_removes_expired() {
        init_test_environment().await;

        let session = WebSessionStore::create_web_session(43).await.unwrap();

        // Not yet expired: the sweep must leave it alone
        WebSessionStore::delete_expired_web_sessions(Utc::now())
            .await
            .unwrap();
        assert!(
            WebSessionStore::get_web_session(&session.id)
                .await
                .unwrap()
                .is_some()
        );

        // Past expiry: the sweep removes it
        WebSessionStore::delete_expired_web_sessions(
            session.expires_at + chrono::Duration::seconds(1),
        )
        .await
        .unwrap();
        assert!(
            WebSessionStore::get_web_session(&session.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
