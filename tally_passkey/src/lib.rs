//! tally-passkey - WebAuthn passkey ceremonies for the Tally finance assistant
//!
//! This crate implements the server side of passkey registration and
//! authentication: short-lived challenge sessions, the two ceremony
//! orchestrators, and the stores they write to. Cryptographic assertion
//! verification is delegated to `ring`; CBOR/COSE parsing to `ciborium`.

mod passkey;
mod session;
mod storage;
mod userdb;
mod utils;

#[cfg(test)]
mod test_utils;

pub use passkey::{
    AuthenticationOptions, AuthenticatorResponse, CeremonyType, ChallengeSession, ChallengeStore,
    CredentialFlags, CredentialStore, PasskeyCredential, PasskeyError, RegisterCredential,
    RegistrationOptions,
    cleanup_expired_sessions, delete_user_credential, finish_authentication, finish_registration,
    list_user_credentials, start_authentication, start_registration, user_has_passkeys,
};
pub use session::{SESSION_COOKIE_NAME, SessionError, WebSession, WebSessionStore};
pub use userdb::{User, UserError, UserStore};
pub use utils::UtilError;

/// Initialize the backing stores. Must be called once at process start,
/// after the environment is loaded.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    storage::init().await?;
    userdb::init().await?;
    session::init().await?;
    passkey::init().await?;
    Ok(())
}
