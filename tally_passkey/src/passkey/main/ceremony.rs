//! The ceremony crypto adapter: builds challenge options for the browser
//! and verifies assertion responses. Pure transformation plus delegated
//! cryptographic verification; nothing here touches the stores.

use ring::{digest, signature::UnparsedPublicKey};
use subtle::ConstantTimeEq;

use super::types::{
    AuthenticationOptions, AuthenticatorData, AuthenticatorResponse, AuthenticatorSelection,
    CredentialDescriptor, ParsedClientData, PubKeyCredParam, RegistrationOptions, RelyingParty,
    UserEntity,
};
use crate::passkey::config::{
    PASSKEY_ATTESTATION, PASSKEY_RESIDENT_KEY, PASSKEY_TIMEOUT, PASSKEY_USER_VERIFICATION,
    WEBAUTHN_RP_ID, WEBAUTHN_RP_NAME, WEBAUTHN_RP_ORIGIN,
};
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{ChallengeSession, CredentialFlags, PasskeyCredential};
use crate::userdb::User;
use crate::utils::{base64url_decode, base64url_encode, gen_challenge};

/// Outcome of a verified assertion: which credential signed, and the
/// authenticator state it reported.
#[derive(Debug)]
pub(super) struct VerifiedAssertion {
    pub(super) credential_id: Vec<u8>,
    pub(super) sign_count: u32,
    pub(super) flags: CredentialFlags,
}

fn descriptor(credential: &PasskeyCredential) -> CredentialDescriptor {
    CredentialDescriptor {
        type_: "public-key".to_string(),
        id: base64url_encode(&credential.credential_id),
        transports: credential.transports.clone(),
    }
}

/// Creation options scoped to the user's current credentials, so the
/// authenticator refuses to re-register one it already holds.
pub(super) fn build_registration_options(
    user: &User,
    existing: &[PasskeyCredential],
) -> Result<(RegistrationOptions, String, String), PasskeyError> {
    let challenge = gen_challenge()?;
    let user_verification = PASSKEY_USER_VERIFICATION.clone();

    let options = RegistrationOptions {
        challenge: challenge.clone(),
        rp: RelyingParty {
            id: WEBAUTHN_RP_ID.to_string(),
            name: WEBAUTHN_RP_NAME.to_string(),
        },
        user: UserEntity {
            id: base64url_encode(&user.webauthn_id()),
            name: user.webauthn_name(),
            display_name: user.webauthn_display_name(),
        },
        // ES256 only: advertise exactly what the assertion path verifies
        pub_key_cred_params: vec![PubKeyCredParam {
            type_: "public-key".to_string(),
            alg: -7,
        }],
        exclude_credentials: existing.iter().map(descriptor).collect(),
        authenticator_selection: AuthenticatorSelection {
            resident_key: PASSKEY_RESIDENT_KEY.to_string(),
            user_verification: user_verification.clone(),
        },
        timeout: *PASSKEY_TIMEOUT * 1000,
        attestation: PASSKEY_ATTESTATION.to_string(),
    };

    Ok((options, challenge, user_verification))
}

/// Assertion options listing the user's registered credentials.
pub(super) fn build_authentication_options(
    existing: &[PasskeyCredential],
) -> Result<(AuthenticationOptions, String, String), PasskeyError> {
    let challenge = gen_challenge()?;
    let user_verification = PASSKEY_USER_VERIFICATION.clone();

    let options = AuthenticationOptions {
        challenge: challenge.clone(),
        timeout: *PASSKEY_TIMEOUT * 1000,
        rp_id: WEBAUTHN_RP_ID.to_string(),
        allow_credentials: existing.iter().map(descriptor).collect(),
        user_verification: user_verification.clone(),
    };

    Ok((options, challenge, user_verification))
}

/// Verify an assertion response against the session's challenge and one
/// of the supplied credentials.
///
/// Checks run in a fixed order and fail closed on the first mismatch:
/// challenge (constant-time), origin, ceremony type, RP ID hash, user
/// presence, user verification when the session required it, user handle,
/// credential match, then the ECDSA P-256 signature over
/// `authenticator_data || SHA-256(client_data)`.
pub(super) fn verify_assertion(
    user: &User,
    credentials: &[PasskeyCredential],
    session: &ChallengeSession,
    response: &AuthenticatorResponse,
) -> Result<VerifiedAssertion, PasskeyError> {
    let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;

    // Constant-time comparison; a one-byte difference costs the same as a
    // full mismatch
    let challenge_ok: bool = client_data
        .challenge
        .as_bytes()
        .ct_eq(session.challenge.as_bytes())
        .into();
    if !challenge_ok {
        return Err(PasskeyError::ChallengeMismatch);
    }

    if client_data.origin != *WEBAUTHN_RP_ORIGIN {
        return Err(PasskeyError::OriginMismatch);
    }

    if client_data.type_ != "webauthn.get" {
        return Err(PasskeyError::CeremonyTypeMismatch);
    }

    let auth_data = AuthenticatorData::from_base64(&response.response.authenticator_data)?;

    let expected_hash = digest::digest(&digest::SHA256, WEBAUTHN_RP_ID.as_bytes());
    if auth_data.rp_id_hash != expected_hash.as_ref() {
        return Err(PasskeyError::RpIdHashMismatch);
    }

    if !auth_data.is_user_present() {
        return Err(PasskeyError::UserNotPresent);
    }

    if session.user_verification == "required" && !auth_data.is_user_verified() {
        return Err(PasskeyError::UserNotVerified);
    }

    // Discoverable credentials report which account they belong to; when
    // present it must be the account this ceremony was opened for
    if let Some(handle) = &response.response.user_handle {
        if !handle.is_empty() {
            let handle_bytes = base64url_decode(handle)
                .map_err(|e| PasskeyError::Format(format!("Invalid user handle: {e}")))?;
            if handle_bytes != user.webauthn_id() {
                return Err(PasskeyError::CryptoVerificationFailed);
            }
        }
    }

    let credential_id = base64url_decode(&response.raw_id)
        .map_err(|e| PasskeyError::Format(format!("Invalid credential id: {e}")))?;

    let credential = credentials
        .iter()
        .find(|c| c.credential_id == credential_id)
        .ok_or(PasskeyError::CryptoVerificationFailed)?;

    let signature = base64url_decode(&response.response.signature)
        .map_err(|e| PasskeyError::Format(format!("Invalid signature: {e}")))?;

    let client_data_hash = digest::digest(&digest::SHA256, &client_data.raw_data);
    let mut signed_data = Vec::with_capacity(auth_data.raw_data.len() + 32);
    signed_data.extend_from_slice(&auth_data.raw_data);
    signed_data.extend_from_slice(client_data_hash.as_ref());

    let public_key = UnparsedPublicKey::new(
        &ring::signature::ECDSA_P256_SHA256_ASN1,
        &credential.public_key,
    );
    public_key
        .verify(&signed_data, &signature)
        .map_err(|_| PasskeyError::CryptoVerificationFailed)?;

    Ok(VerifiedAssertion {
        credential_id,
        sign_count: auth_data.sign_count,
        flags: CredentialFlags {
            user_present: auth_data.is_user_present(),
            user_verified: auth_data.is_user_verified(),
            backup_eligible: auth_data.is_backup_eligible(),
            backup_state: auth_data.is_backed_up(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::main::test_support::{TestAuthenticator, make_auth_data, make_client_data};
    use crate::passkey::types::CeremonyType;
    use crate::test_utils::init_test_environment;
    use chrono::{Duration, Utc};

    fn test_user() -> User {
        User::new(31337, "mika".into(), "Mika".into(), Some("mika@example.com".into()))
    }

    fn test_session(challenge: &str) -> ChallengeSession {
        let now = Utc::now();
        ChallengeSession {
            id: "9".repeat(64),
            user_id: 31337,
            challenge: challenge.to_string(),
            user_verification: "required".into(),
            ceremony_type: CeremonyType::Authentication,
            expires_at: now + Duration::minutes(5),
            created_at: now,
        }
    }

    fn stored_credential(authenticator: &TestAuthenticator, user_id: i64) -> PasskeyCredential {
        let now = Utc::now();
        PasskeyCredential {
            credential_id: authenticator.credential_id.clone(),
            user_id,
            public_key: authenticator.public_key(),
            attestation_type: "none".into(),
            aaguid: authenticator.aaguid.to_vec(),
            sign_count: 5,
            clone_warning: false,
            flags: CredentialFlags {
                user_present: true,
                user_verified: true,
                backup_eligible: false,
                backup_state: false,
            },
            transports: vec![],
            name: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn assertion_response(
        authenticator: &TestAuthenticator,
        challenge: &str,
        origin: &str,
        flags: u8,
        sign_count: u32,
    ) -> AuthenticatorResponse {
        let auth_data = make_auth_data("example.com", flags, sign_count, None);
        let client_data = make_client_data("webauthn.get", challenge, origin);
        let signature = authenticator.sign_assertion(&auth_data, &client_data);

        AuthenticatorResponse {
            id: crate::utils::base64url_encode(&authenticator.credential_id),
            raw_id: crate::utils::base64url_encode(&authenticator.credential_id),
            type_: "public-key".into(),
            response: super::super::types::AssertionResponse {
                client_data_json: client_data,
                authenticator_data: crate::utils::base64url_encode(&auth_data),
                signature,
                user_handle: None,
            },
        }
    }

    #[tokio::test]
    async fn test_valid_assertion_verifies() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-1");
        let credential = stored_credential(&authenticator, user.id);
        let session = test_session("challenge-abc");

        let response = assertion_response(
            &authenticator,
            "challenge-abc",
            "https://example.com",
            0b0001_0101,
            6,
        );
        let verified =
            verify_assertion(&user, std::slice::from_ref(&credential), &session, &response)
                .unwrap();
        assert_eq!(verified.credential_id, credential.credential_id);
        assert_eq!(verified.sign_count, 6);
        assert!(verified.flags.backup_state);
    }

    #[tokio::test]
    async fn test_challenge_off_by_one_byte_fails() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-2");
        let credential = stored_credential(&authenticator, user.id);
        let session = test_session("challenge-abc");

        // Same length, last byte differs
        let response = assertion_response(
            &authenticator,
            "challenge-abd",
            "https://example.com",
            0b0000_0101,
            6,
        );
        assert!(matches!(
            verify_assertion(&user, std::slice::from_ref(&credential), &session, &response),
            Err(PasskeyError::ChallengeMismatch)
        ));
    }

    #[tokio::test]
    async fn test_wrong_origin_fails() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-3");
        let credential = stored_credential(&authenticator, user.id);
        let session = test_session("challenge-abc");

        let response = assertion_response(
            &authenticator,
            "challenge-abc",
            "https://evil.example.net",
            0b0000_0101,
            6,
        );
        assert!(matches!(
            verify_assertion(&user, std::slice::from_ref(&credential), &session, &response),
            Err(PasskeyError::OriginMismatch)
        ));
    }

    #[tokio::test]
    async fn test_user_verification_enforced_when_required() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-4");
        let credential = stored_credential(&authenticator, user.id);
        let session = test_session("challenge-abc");

        // UP set, UV clear
        let response = assertion_response(
            &authenticator,
            "challenge-abc",
            "https://example.com",
            0b0000_0001,
            6,
        );
        assert!(matches!(
            verify_assertion(&user, std::slice::from_ref(&credential), &session, &response),
            Err(PasskeyError::UserNotVerified)
        ));
    }

    #[tokio::test]
    async fn test_tampered_signature_fails() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-5");
        let imposter = TestAuthenticator::new(b"cer-5");
        let credential = stored_credential(&authenticator, user.id);
        let session = test_session("challenge-abc");

        // Signed with a different private key for the same credential id
        let response = assertion_response(
            &imposter,
            "challenge-abc",
            "https://example.com",
            0b0000_0101,
            6,
        );
        assert!(matches!(
            verify_assertion(&user, std::slice::from_ref(&credential), &session, &response),
            Err(PasskeyError::CryptoVerificationFailed)
        ));
    }

    #[tokio::test]
    async fn test_unknown_credential_id_fails() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-6");
        let session = test_session("challenge-abc");

        let response = assertion_response(
            &authenticator,
            "challenge-abc",
            "https://example.com",
            0b0000_0101,
            6,
        );
        assert!(matches!(
            verify_assertion(&user, &[], &session, &response),
            Err(PasskeyError::CryptoVerificationFailed)
        ));
    }

    #[tokio::test]
    async fn test_foreign_user_handle_fails() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-7");
        let credential = stored_credential(&authenticator, user.id);
        let session = test_session("challenge-abc");

        let mut response = assertion_response(
            &authenticator,
            "challenge-abc",
            "https://example.com",
            0b0000_0101,
            6,
        );
        let other = User::new(999, "other".into(), "Other".into(), None);
        response.response.user_handle =
            Some(crate::utils::base64url_encode(&other.webauthn_id()));

        assert!(matches!(
            verify_assertion(&user, std::slice::from_ref(&credential), &session, &response),
            Err(PasskeyError::CryptoVerificationFailed)
        ));
    }

    #[tokio::test]
    async fn test_registration_options_exclude_existing_credentials() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-8");
        let credential = stored_credential(&authenticator, user.id);

        let (options, challenge, user_verification) =
            build_registration_options(&user, std::slice::from_ref(&credential)).unwrap();

        assert_eq!(options.challenge, challenge);
        assert_eq!(user_verification, "required");
        assert_eq!(options.exclude_credentials.len(), 1);
        assert_eq!(
            options.exclude_credentials[0].id,
            crate::utils::base64url_encode(&credential.credential_id)
        );
        assert_eq!(options.pub_key_cred_params.len(), 1);
        assert_eq!(options.pub_key_cred_params[0].alg, -7);
        assert_eq!(options.rp.id, "example.com");
    }

    #[tokio::test]
    async fn test_authentication_options_list_allowed_credentials() {
        init_test_environment().await;
        let user = test_user();
        let authenticator = TestAuthenticator::new(b"cer-9");
        let credential = stored_credential(&authenticator, user.id);

        let (options, challenge, _) =
            build_authentication_options(std::slice::from_ref(&credential)).unwrap();

        assert_eq!(options.challenge, challenge);
        assert_eq!(options.allow_credentials.len(), 1);
        assert_eq!(options.rp_id, "example.com");
        assert_eq!(options.timeout, 60_000);
    }
}
