mod auth;
mod ceremony;
mod challenge;
mod manage;
mod register;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{finish_authentication, start_authentication};
pub use manage::{
    cleanup_expired_sessions, delete_user_credential, list_user_credentials, user_has_passkeys,
};
pub use register::{finish_registration, start_registration};
pub use types::{
    AuthenticationOptions, AuthenticatorResponse, RegisterCredential, RegistrationOptions,
};
