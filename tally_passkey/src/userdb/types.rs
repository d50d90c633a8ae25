use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account of the finance assistant, referenced by the ceremony core.
///
/// The numeric `id` is the stable identity everything else hangs off:
/// credentials and ceremony sessions store it as their owner, and it is
/// the source of the WebAuthn user handle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    /// Stable numeric account id
    pub id: i64,
    /// Login identifier
    pub username: String,
    /// Human-friendly display name
    pub name: String,
    /// Email address, if the account has one
    pub email: Option<String>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: i64, username: String, name: String, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            name,
            email,
            created_at: now,
            updated_at: now,
        }
    }

    /// WebAuthn user handle: the account id as 8 big-endian bytes.
    pub fn webauthn_id(&self) -> Vec<u8> {
        self.id.to_be_bytes().to_vec()
    }

    /// Account name shown by the authenticator UI. Email when present,
    /// username otherwise.
    pub fn webauthn_name(&self) -> String {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => self.username.clone(),
        }
    }

    /// Display name shown by the authenticator UI.
    pub fn webauthn_display_name(&self) -> String {
        if self.name.is_empty() {
            self.username.clone()
        } else {
            self.name.clone()
        }
    }
}
