use std::{env, sync::LazyLock};

use super::errors::PasskeyError;

/// Relying-party id: the domain the passkeys are scoped to.
pub(super) static WEBAUTHN_RP_ID: LazyLock<String> =
    LazyLock::new(|| env::var("WEBAUTHN_RP_ID").expect("WEBAUTHN_RP_ID must be set"));

/// Relying-party origin: scheme + host the browser must report in
/// clientDataJSON, compared exactly. Normalized through `url` so that
/// `https://example.com/` and `https://example.com` configure the same
/// origin.
pub(super) static WEBAUTHN_RP_ORIGIN: LazyLock<String> = LazyLock::new(|| {
    let raw = env::var("WEBAUTHN_RP_ORIGIN").expect("WEBAUTHN_RP_ORIGIN must be set");
    let parsed = url::Url::parse(&raw).expect("WEBAUTHN_RP_ORIGIN must be a valid URL");
    parsed.origin().ascii_serialization()
});

pub(super) static WEBAUTHN_RP_NAME: LazyLock<String> =
    LazyLock::new(|| env::var("WEBAUTHN_RP_NAME").unwrap_or_else(|_| "Tally".to_string()));

/// Ceremony timeout handed to the browser, in seconds.
pub(super) static PASSKEY_TIMEOUT: LazyLock<u32> = LazyLock::new(|| {
    env::var("PASSKEY_TIMEOUT")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(60)
});

/// Challenge session lifetime, in seconds.
pub(super) static PASSKEY_CHALLENGE_TIMEOUT: LazyLock<u32> = LazyLock::new(|| {
    env::var("PASSKEY_CHALLENGE_TIMEOUT")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(300)
});

pub(super) static PASSKEY_USER_VERIFICATION: LazyLock<String> = LazyLock::new(|| {
    env::var("PASSKEY_USER_VERIFICATION").map_or(
        "required".to_string(),
        |v| match v.to_lowercase().as_str() {
            "required" => "required".to_string(),
            "preferred" => "preferred".to_string(),
            "discouraged" => "discouraged".to_string(),
            invalid => {
                tracing::warn!(
                    "Invalid user verification: {}. Using default 'required'",
                    invalid
                );
                "required".to_string()
            }
        },
    )
});

pub(super) static PASSKEY_RESIDENT_KEY: LazyLock<String> = LazyLock::new(|| {
    env::var("PASSKEY_RESIDENT_KEY").map_or(
        "preferred".to_string(),
        |v| match v.to_lowercase().as_str() {
            "required" => "required".to_string(),
            "preferred" => "preferred".to_string(),
            "discouraged" => "discouraged".to_string(),
            invalid => {
                tracing::warn!(
                    "Invalid resident key requirement: {}. Using default 'preferred'",
                    invalid
                );
                "preferred".to_string()
            }
        },
    )
});

/// Passkeys carry no attestation statement worth verifying; ask for none.
pub(super) static PASSKEY_ATTESTATION: LazyLock<String> =
    LazyLock::new(|| env::var("PASSKEY_ATTESTATION").unwrap_or_else(|_| "none".to_string()));

/// Per-user passkey ceiling. Enough for several devices plus backup keys
/// while keeping credential spam bounded.
pub(super) const MAX_CREDENTIALS_PER_USER: usize = 10;

/// Minimum plausible COSE key material length; a sanity check, not key
/// validation.
pub(super) const MIN_PUBLIC_KEY_LENGTH: usize = 32;

pub(super) fn validate() -> Result<(), PasskeyError> {
    if WEBAUTHN_RP_ID.is_empty() {
        return Err(PasskeyError::Config("WEBAUTHN_RP_ID is empty".into()));
    }
    if WEBAUTHN_RP_ORIGIN.is_empty() {
        return Err(PasskeyError::Config("WEBAUTHN_RP_ORIGIN is empty".into()));
    }
    Ok(())
}
