use std::{env, str::FromStr, sync::LazyLock};

use sqlx::{Pool, Postgres, Sqlite};
use tokio::sync::Mutex;

/// Table prefix, so several deployments can share one database.
pub(crate) static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "tally_".to_string()));

/// Backend-agnostic handle to the one database every store talks to.
/// Each store downcasts to the pool it needs and keeps its SQL in
/// per-backend modules.
pub(crate) trait DataStore: Send + Sync {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>>;
    fn as_postgres(&self) -> Option<&Pool<Postgres>>;
}

#[derive(Clone, Debug)]
pub(crate) struct SqliteDataStore {
    pool: sqlx::SqlitePool,
}

#[derive(Clone, Debug)]
pub(crate) struct PostgresDataStore {
    pool: sqlx::PgPool,
}

impl DataStore for SqliteDataStore {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        Some(&self.pool)
    }

    fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        None
    }
}

impl DataStore for PostgresDataStore {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        None
    }

    fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        Some(&self.pool)
    }
}

fn connect(store_type: &str, store_url: &str) -> Box<dyn DataStore> {
    match store_type {
        "sqlite" => {
            let opts = sqlx::sqlite::SqliteConnectOptions::from_str(store_url)
                .expect("GENERIC_DATA_STORE_URL is not a valid SQLite connection string")
                .create_if_missing(true);

            Box::new(SqliteDataStore {
                pool: sqlx::sqlite::SqlitePool::connect_lazy_with(opts),
            })
        }
        "postgres" => Box::new(PostgresDataStore {
            pool: sqlx::PgPool::connect_lazy(store_url)
                .expect("GENERIC_DATA_STORE_URL is not a valid Postgres connection string"),
        }),
        other => panic!("GENERIC_DATA_STORE_TYPE must be 'sqlite' or 'postgres', got '{other}'"),
    }
}

pub(crate) static GENERIC_DATA_STORE: LazyLock<Mutex<Box<dyn DataStore>>> = LazyLock::new(|| {
    let store_type =
        env::var("GENERIC_DATA_STORE_TYPE").expect("GENERIC_DATA_STORE_TYPE must be set");
    let store_url =
        env::var("GENERIC_DATA_STORE_URL").expect("GENERIC_DATA_STORE_URL must be set");

    tracing::info!(%store_type, %store_url, "connecting data store");

    Mutex::new(connect(&store_type, &store_url))
});
