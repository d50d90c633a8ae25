use sqlx::{Pool, Sqlite};

use super::DB_TABLE_USERS;
use crate::userdb::errors::UserError;
use crate::userdb::types::User;

pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), UserError> {
    let users_table = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id BIGINT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        users_table
    ))
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_{}_email ON {}(email) WHERE email IS NOT NULL"#,
        users_table.replace('.', "_"),
        users_table
    ))
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn upsert_user_sqlite(pool: &Pool<Sqlite>, user: &User) -> Result<(), UserError> {
    let users_table = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {} (id, username, name, email, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            name = excluded.name,
            email = excluded.email,
            updated_at = excluded.updated_at
        "#,
        users_table
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_user_by_id_sqlite(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<Option<User>, UserError> {
    let users_table = DB_TABLE_USERS.as_str();

    sqlx::query_as::<_, User>(&format!(r#"SELECT * FROM {} WHERE id = ?"#, users_table))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))
}

pub(super) async fn get_user_by_email_sqlite(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<User>, UserError> {
    let users_table = DB_TABLE_USERS.as_str();

    sqlx::query_as::<_, User>(&format!(r#"SELECT * FROM {} WHERE email = ?"#, users_table))
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))
}
