mod data_store;
mod errors;

pub(crate) use data_store::{DB_TABLE_PREFIX, GENERIC_DATA_STORE};
pub use errors::StorageError;

pub(crate) async fn init() -> Result<(), StorageError> {
    // Force the lazy connection so a bad configuration fails at startup,
    // not on the first ceremony.
    let _ = GENERIC_DATA_STORE.lock().await;
    Ok(())
}
