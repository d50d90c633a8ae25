mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use errors::PasskeyError;
pub use main::{
    AuthenticationOptions, AuthenticatorResponse, RegisterCredential, RegistrationOptions,
    cleanup_expired_sessions, delete_user_credential, finish_authentication, finish_registration,
    list_user_credentials, start_authentication, start_registration, user_has_passkeys,
};
pub use storage::{ChallengeStore, CredentialStore};
pub use types::{CeremonyType, ChallengeSession, CredentialFlags, PasskeyCredential};

pub(crate) async fn init() -> Result<(), PasskeyError> {
    // Validate the relying-party configuration eagerly
    config::validate()?;
    CredentialStore::init().await?;
    ChallengeStore::init().await?;
    Ok(())
}
