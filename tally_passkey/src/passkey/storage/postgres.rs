use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::rows::{CredentialRow, SessionRow, encode_credential_id};
use super::{DB_TABLE_CHALLENGE_SESSIONS, DB_TABLE_PASSKEY_CREDENTIALS};
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{ChallengeSession, PasskeyCredential};
use crate::userdb::DB_TABLE_USERS;

pub(super) async fn create_credential_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();
    let users_table = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            credential_id TEXT PRIMARY KEY NOT NULL,
            user_id BIGINT NOT NULL REFERENCES {}(id),
            public_key TEXT NOT NULL,
            attestation_type TEXT NOT NULL,
            aaguid TEXT NOT NULL,
            sign_count BIGINT NOT NULL DEFAULT 0,
            clone_warning BOOLEAN NOT NULL DEFAULT FALSE,
            flags_user_present BOOLEAN NOT NULL,
            flags_user_verified BOOLEAN NOT NULL,
            flags_backup_eligible BOOLEAN NOT NULL,
            flags_backup_state BOOLEAN NOT NULL,
            transports TEXT NOT NULL DEFAULT '[]',
            credential_name TEXT,
            last_used_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        credentials_table, users_table
    ))
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"CREATE INDEX IF NOT EXISTS idx_{}_user_id ON {}(user_id)"#,
        credentials_table.replace('.', "_"),
        credentials_table
    ))
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn create_session_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), PasskeyError> {
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id BIGINT NOT NULL,
            challenge TEXT NOT NULL,
            user_verification TEXT NOT NULL,
            ceremony_type TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        sessions_table
    ))
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"CREATE INDEX IF NOT EXISTS idx_{}_expires_at ON {}(expires_at)"#,
        sessions_table.replace('.', "_"),
        sessions_table
    ))
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

fn insert_credential_query(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {}
        (credential_id, user_id, public_key, attestation_type, aaguid, sign_count,
         clone_warning, flags_user_present, flags_user_verified, flags_backup_eligible,
         flags_backup_state, transports, credential_name, last_used_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
        table
    )
}

fn bind_credential_insert<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    row: &'q CredentialRow,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&row.credential_id)
        .bind(row.user_id)
        .bind(&row.public_key)
        .bind(&row.attestation_type)
        .bind(&row.aaguid)
        .bind(row.sign_count)
        .bind(row.clone_warning)
        .bind(row.flags_user_present)
        .bind(row.flags_user_verified)
        .bind(row.flags_backup_eligible)
        .bind(row.flags_backup_state)
        .bind(&row.transports)
        .bind(&row.credential_name)
        .bind(row.last_used_at)
        .bind(row.created_at)
        .bind(row.updated_at)
}

fn update_credential_query(table: &str) -> String {
    format!(
        r#"
        UPDATE {}
        SET sign_count = $1, clone_warning = $2, flags_backup_state = $3,
            credential_name = $4, last_used_at = $5, updated_at = $6
        WHERE credential_id = $7
        "#,
        table
    )
}

pub(super) async fn store_credential_postgres(
    pool: &Pool<Postgres>,
    credential: &PasskeyCredential,
) -> Result<(), PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();
    let row = CredentialRow::from(credential);

    bind_credential_insert(
        sqlx::query(&insert_credential_query(credentials_table)),
        &row,
    )
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_credential_postgres(
    pool: &Pool<Postgres>,
    credential_id: &[u8],
) -> Result<Option<PasskeyCredential>, PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();

    let row = sqlx::query_as::<_, CredentialRow>(&format!(
        r#"SELECT * FROM {} WHERE credential_id = $1"#,
        credentials_table
    ))
    .bind(encode_credential_id(credential_id))
    .fetch_optional(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    row.map(PasskeyCredential::try_from).transpose()
}

pub(super) async fn get_credentials_by_user_postgres(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<Vec<PasskeyCredential>, PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();

    let rows = sqlx::query_as::<_, CredentialRow>(&format!(
        r#"SELECT * FROM {} WHERE user_id = $1 ORDER BY created_at DESC"#,
        credentials_table
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    rows.into_iter().map(PasskeyCredential::try_from).collect()
}

pub(super) async fn update_credential_postgres(
    pool: &Pool<Postgres>,
    credential: &PasskeyCredential,
) -> Result<(), PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();
    let row = CredentialRow::from(credential);

    sqlx::query(&update_credential_query(credentials_table))
        .bind(row.sign_count)
        .bind(row.clone_warning)
        .bind(row.flags_backup_state)
        .bind(&row.credential_name)
        .bind(row.last_used_at)
        .bind(row.updated_at)
        .bind(&row.credential_id)
        .execute(pool)
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_credential_postgres(
    pool: &Pool<Postgres>,
    credential_id: &[u8],
) -> Result<(), PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();

    sqlx::query(&format!(
        r#"DELETE FROM {} WHERE credential_id = $1"#,
        credentials_table
    ))
    .bind(encode_credential_id(credential_id))
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn store_credential_and_drop_session_postgres(
    pool: &Pool<Postgres>,
    credential: &PasskeyCredential,
    session_id: &str,
) -> Result<(), PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();
    let row = CredentialRow::from(credential);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    bind_credential_insert(
        sqlx::query(&insert_credential_query(credentials_table)),
        &row,
    )
    .execute(&mut *tx)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    // Session cleanup is non-critical inside this unit of work
    if let Err(e) = sqlx::query(&format!(r#"DELETE FROM {} WHERE id = $1"#, sessions_table))
        .bind(session_id)
        .execute(&mut *tx)
        .await
    {
        tracing::warn!("Failed to drop ceremony session {}: {}", session_id, e);
    }

    tx.commit()
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn update_credential_and_drop_session_postgres(
    pool: &Pool<Postgres>,
    credential: &PasskeyCredential,
    session_id: &str,
) -> Result<(), PasskeyError> {
    let credentials_table = DB_TABLE_PASSKEY_CREDENTIALS.as_str();
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();
    let row = CredentialRow::from(credential);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    sqlx::query(&update_credential_query(credentials_table))
        .bind(row.sign_count)
        .bind(row.clone_warning)
        .bind(row.flags_backup_state)
        .bind(&row.credential_name)
        .bind(row.last_used_at)
        .bind(row.updated_at)
        .bind(&row.credential_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    if let Err(e) = sqlx::query(&format!(r#"DELETE FROM {} WHERE id = $1"#, sessions_table))
        .bind(session_id)
        .execute(&mut *tx)
        .await
    {
        tracing::warn!("Failed to drop ceremony session {}: {}", session_id, e);
    }

    tx.commit()
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn create_session_postgres(
    pool: &Pool<Postgres>,
    session: &ChallengeSession,
) -> Result<(), PasskeyError> {
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();
    let row = SessionRow::from(session);

    sqlx::query(&format!(
        r#"
        INSERT INTO {}
        (id, user_id, challenge, user_verification, ceremony_type, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        sessions_table
    ))
    .bind(&row.id)
    .bind(row.user_id)
    .bind(&row.challenge)
    .bind(&row.user_verification)
    .bind(&row.ceremony_type)
    .bind(row.expires_at)
    .bind(row.created_at)
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_session_postgres(
    pool: &Pool<Postgres>,
    session_id: &str,
) -> Result<Option<ChallengeSession>, PasskeyError> {
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();

    let row = sqlx::query_as::<_, SessionRow>(&format!(
        r#"SELECT * FROM {} WHERE id = $1"#,
        sessions_table
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    row.map(ChallengeSession::try_from).transpose()
}

pub(super) async fn delete_session_postgres(
    pool: &Pool<Postgres>,
    session_id: &str,
) -> Result<(), PasskeyError> {
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();

    sqlx::query(&format!(r#"DELETE FROM {} WHERE id = $1"#, sessions_table))
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_expired_sessions_postgres(
    pool: &Pool<Postgres>,
    now: DateTime<Utc>,
) -> Result<u64, PasskeyError> {
    let sessions_table = DB_TABLE_CHALLENGE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"DELETE FROM {} WHERE expires_at < $1"#,
        sessions_table
    ))
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}
