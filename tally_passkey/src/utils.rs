use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Generates an opaque bearer token: 32 random bytes, lowercase hex.
///
/// The hex form is what goes into the `webauthn_session` and `session_id`
/// cookies, so the HTTP layer can validate tokens against a fixed
/// 64-character pattern before touching the store.
pub(crate) fn gen_session_id() -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut token = [0u8; 32];
    rng.fill(&mut token)
        .map_err(|_| UtilError::Crypto("Failed to generate session id".to_string()))?;
    Ok(hex::encode(token))
}

/// Generates a ceremony challenge: 32 random bytes, base64url without
/// padding, the encoding the browser echoes back in clientDataJSON.
pub(crate) fn gen_challenge() -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut challenge = [0u8; 32];
    rng.fill(&mut challenge)
        .map_err(|_| UtilError::Crypto("Failed to generate challenge".to_string()))?;
    Ok(base64url_encode(&challenge))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_64_lowercase_hex() {
        let id = gen_session_id().unwrap();
        assert_eq!(id.len(), 64);
        assert!(id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = gen_session_id().unwrap();
        let b = gen_session_id().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_challenge_roundtrips_through_base64url() {
        let challenge = gen_challenge().unwrap();
        let decoded = base64url_decode(&challenge).unwrap();
        assert_eq!(decoded.len(), 32);
        assert_eq!(base64url_encode(&decoded), challenge);
    }

    #[test]
    fn test_base64url_decode_rejects_standard_alphabet() {
        // '+' and '/' belong to the standard alphabet, not base64url
        assert!(base64url_decode("a+b/c").is_err());
    }
}
