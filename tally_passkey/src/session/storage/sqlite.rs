use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use super::DB_TABLE_WEB_SESSIONS;
use crate::session::errors::SessionError;
use crate::session::types::WebSession;

pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), SessionError> {
    let sessions_table = DB_TABLE_WEB_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id BIGINT NOT NULL,
            expires_at TIMESTAMP NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        sessions_table
    ))
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"CREATE INDEX IF NOT EXISTS idx_{}_expires_at ON {}(expires_at)"#,
        sessions_table.replace('.', "_"),
        sessions_table
    ))
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn create_session_sqlite(
    pool: &Pool<Sqlite>,
    session: &WebSession,
) -> Result<(), SessionError> {
    let sessions_table = DB_TABLE_WEB_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"INSERT INTO {} (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)"#,
        sessions_table
    ))
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_session_sqlite(
    pool: &Pool<Sqlite>,
    session_id: &str,
) -> Result<Option<WebSession>, SessionError> {
    let sessions_table = DB_TABLE_WEB_SESSIONS.as_str();

    sqlx::query_as::<_, WebSession>(&format!(
        r#"SELECT * FROM {} WHERE id = ?"#,
        sessions_table
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))
}

pub(super) async fn delete_session_sqlite(
    pool: &Pool<Sqlite>,
    session_id: &str,
) -> Result<(), SessionError> {
    let sessions_table = DB_TABLE_WEB_SESSIONS.as_str();

    sqlx::query(&format!(r#"DELETE FROM {} WHERE id = ?"#, sessions_table))
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_expired_sessions_sqlite(
    pool: &Pool<Sqlite>,
    now: DateTime<Utc>,
) -> Result<u64, SessionError> {
    let sessions_table = DB_TABLE_WEB_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"DELETE FROM {} WHERE expires_at < ?"#,
        sessions_table
    ))
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}
