use thiserror::Error;

use crate::utils::UtilError;

/// Errors raised during passkey ceremonies.
///
/// Every protocol failure has its own closed variant so callers can match
/// exhaustively; free-form strings are reserved for storage, parsing and
/// configuration trouble. All variants are terminal for the current
/// ceremony attempt: nothing here is retried, the caller must begin a new
/// ceremony.
#[derive(Debug, Error)]
pub enum PasskeyError {
    /// The ceremony session is missing, expired, opened for a different
    /// ceremony type, or owned by a different user. One variant for all
    /// four: callers must not be able to tell an expired session from
    /// one that never existed.
    #[error("invalid or expired ceremony session")]
    InvalidSession,

    /// A login ceremony was requested for a user without passkeys
    #[error("user has no registered passkeys")]
    NoCredentials,

    /// The per-user credential ceiling was reached
    #[error("maximum number of passkeys reached")]
    TooManyCredentials,

    /// The echoed challenge does not equal the session's challenge
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The browser reported an origin other than the configured one
    #[error("origin mismatch")]
    OriginMismatch,

    /// Client data declared the wrong ceremony type
    #[error("ceremony type mismatch")]
    CeremonyTypeMismatch,

    /// Authenticator data was produced for a different relying party
    #[error("relying party id hash mismatch")]
    RpIdHashMismatch,

    /// Registration response without attested credential data
    #[error("attested credential data missing")]
    MissingCredentialData,

    /// The authenticator did not report user presence
    #[error("user not present")]
    UserNotPresent,

    /// User verification was required but the authenticator did not do it
    #[error("user verification required")]
    UserNotVerified,

    /// Credential id or public key empty, or key material implausibly short
    #[error("credential key material empty or too short")]
    EmptyOrShortKeyMaterial,

    /// The credential id is already registered
    #[error("credential already registered")]
    DuplicateCredential,

    /// The credential exists but belongs to a different user
    #[error("credential does not belong to user")]
    OwnershipMismatch,

    /// Signature verification (or credential matching inside it) failed
    #[error("assertion verification failed")]
    CryptoVerificationFailed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid format: {0}")]
    Format(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("utils error: {0}")]
    Utils(#[from] UtilError),
}
