//! Shared test initialization: loads `.env_test` once and makes sure the
//! store tables exist before any test touches them.

use std::sync::Once;

pub(crate) async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
    });

    if let Err(e) = crate::userdb::UserStore::init().await {
        eprintln!("Warning: failed to initialize UserStore: {e}");
    }
    if let Err(e) = crate::session::WebSessionStore::init().await {
        eprintln!("Warning: failed to initialize WebSessionStore: {e}");
    }
    if let Err(e) = crate::passkey::CredentialStore::init().await {
        eprintln!("Warning: failed to initialize CredentialStore: {e}");
    }
    if let Err(e) = crate::passkey::ChallengeStore::init().await {
        eprintln!("Warning: failed to initialize ChallengeStore: {e}");
    }
}
