use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which ceremony a challenge session was opened for. A session is only
/// good for the ceremony type it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyType {
    Registration,
    Authentication,
}

impl CeremonyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CeremonyType::Registration => "registration",
            CeremonyType::Authentication => "authentication",
        }
    }
}

/// A stored passkey.
///
/// Created only by a completed registration ceremony; mutated only by a
/// completed authentication ceremony (counter, clone flag, backup state,
/// last-used) or deleted by its owner. Byte fields are raw; the store
/// adapter owns the text encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PasskeyCredential {
    /// Credential id assigned by the authenticator, globally unique
    pub credential_id: Vec<u8>,
    /// Owning account
    pub user_id: i64,
    /// Uncompressed P-256 public key point extracted from the COSE key
    pub public_key: Vec<u8>,
    /// Attestation format tag, informational
    pub attestation_type: String,
    /// Authenticator model identifier
    pub aaguid: Vec<u8>,
    /// Authenticator usage counter; 0 means the authenticator does not
    /// keep one
    pub sign_count: u32,
    /// Set when a non-increasing counter was observed; never cleared
    pub clone_warning: bool,
    pub flags: CredentialFlags,
    /// Transport hints reported by the browser, informational
    pub transports: Vec<String>,
    /// Label chosen by the owner ("MacBook Touch ID", ...)
    pub name: Option<String>,
    /// Last successful authentication with this credential
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticator state flags. `user_present`, `user_verified` and
/// `backup_eligible` are fixed at registration; `backup_state` is
/// refreshed on every successful authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialFlags {
    pub user_present: bool,
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
}

/// Ephemeral ceremony state between Begin* and Finish*.
///
/// The id is a bearer capability: possession of it (via the ceremony
/// cookie) is the only access control until the ceremony completes, so it
/// carries 256 bits of entropy.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeSession {
    /// Opaque token, 64 lowercase hex characters
    pub id: String,
    /// Account the ceremony was opened for
    pub user_id: i64,
    /// Challenge the authenticator must sign over, base64url
    pub challenge: String,
    /// User-verification requirement, carried to finish time
    pub user_verification: String,
    pub ceremony_type: CeremonyType,
    /// Absolute expiry, fixed at creation
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ChallengeSession {
    /// Expiry is advisory-checked by every reader; the store itself never
    /// filters on it.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
