mod postgres;
mod sqlite;

use std::sync::LazyLock;

use crate::storage::{DB_TABLE_PREFIX, GENERIC_DATA_STORE};

use super::errors::UserError;
use super::types::User;

/// Users table name
pub(crate) static DB_TABLE_USERS: LazyLock<String> = LazyLock::new(|| {
    std::env::var("DB_TABLE_USERS").unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "users"))
});

pub struct UserStore;

impl UserStore {
    pub(crate) async fn init() -> Result<(), UserError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_tables_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_tables_postgres(pool).await
        } else {
            Err(UserError::Storage("Unsupported database type".into()))
        }
    }

    /// Insert the user, or refresh its mutable fields if the id exists.
    pub async fn upsert_user(user: User) -> Result<User, UserError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::upsert_user_sqlite(pool, &user).await?;
        } else if let Some(pool) = store.as_postgres() {
            postgres::upsert_user_postgres(pool, &user).await?;
        } else {
            return Err(UserError::Storage("Unsupported database type".into()));
        }
        Ok(user)
    }

    pub async fn get_user_by_id(id: i64) -> Result<Option<User>, UserError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_user_by_id_sqlite(pool, id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_user_by_id_postgres(pool, id).await
        } else {
            Err(UserError::Storage("Unsupported database type".into()))
        }
    }

    pub async fn get_user_by_email(email: &str) -> Result<Option<User>, UserError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_user_by_email_sqlite(pool, email).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_user_by_email_postgres(pool, email).await
        } else {
            Err(UserError::Storage("Unsupported database type".into()))
        }
    }
}
