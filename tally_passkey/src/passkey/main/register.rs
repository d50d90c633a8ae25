use chrono::{Duration, Utc};
use subtle::ConstantTimeEq;

use super::ceremony;
use super::challenge::{discard_session, load_ceremony_session};
use super::types::{
    AttestationObject, AuthenticatorData, ParsedClientData, RegisterCredential,
    RegistrationOptions,
};
use crate::passkey::config::{
    MAX_CREDENTIALS_PER_USER, MIN_PUBLIC_KEY_LENGTH, PASSKEY_CHALLENGE_TIMEOUT,
    PASSKEY_USER_VERIFICATION, WEBAUTHN_RP_ID, WEBAUTHN_RP_ORIGIN,
};
use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::{ChallengeStore, CredentialStore};
use crate::passkey::types::{CeremonyType, ChallengeSession, CredentialFlags, PasskeyCredential};
use crate::userdb::User;
use crate::utils::gen_session_id;

/// Open a registration ceremony for the user: issue a challenge session
/// and return the creation options together with the session id the
/// caller must transport back (as a cookie) for the finish step.
///
/// `existing` is the user's current credential set; the authenticator
/// uses it to refuse re-registering a credential it already holds.
pub async fn start_registration(
    user: &User,
    existing: &[PasskeyCredential],
) -> Result<(RegistrationOptions, String), PasskeyError> {
    let session_id = gen_session_id()?;
    let (options, challenge, user_verification) =
        ceremony::build_registration_options(user, existing)?;

    let now = Utc::now();
    let session = ChallengeSession {
        id: session_id.clone(),
        user_id: user.id,
        challenge,
        user_verification,
        ceremony_type: CeremonyType::Registration,
        expires_at: now + Duration::seconds(*PASSKEY_CHALLENGE_TIMEOUT as i64),
        created_at: now,
    };
    ChallengeStore::create_session(&session).await?;

    tracing::debug!(user_id = user.id, "registration ceremony started");
    Ok((options, session_id))
}

/// Complete a registration ceremony: validate the session, validate the
/// browser's creation response end-to-end, and persist the new
/// credential while dropping the session in one transaction.
///
/// Every failure is terminal for this attempt and consumes the session;
/// the caller must begin a new ceremony to retry.
pub async fn finish_registration(
    user: &User,
    session_id: &str,
    credential_name: Option<String>,
    reg_data: &RegisterCredential,
) -> Result<PasskeyCredential, PasskeyError> {
    let session =
        load_ceremony_session(session_id, CeremonyType::Registration, user.id).await?;

    match register_credential(user, &session, credential_name, reg_data).await {
        Ok(credential) => {
            tracing::info!(
                user_id = user.id,
                name = credential.name.as_deref().unwrap_or("unnamed"),
                user_verified = credential.flags.user_verified,
                backup_eligible = credential.flags.backup_eligible,
                "passkey registered"
            );
            Ok(credential)
        }
        Err(err) => {
            tracing::warn!(user_id = user.id, error = %err, "passkey registration rejected");
            discard_session(&session.id).await;
            Err(err)
        }
    }
}

async fn register_credential(
    user: &User,
    session: &ChallengeSession,
    credential_name: Option<String>,
    reg_data: &RegisterCredential,
) -> Result<PasskeyCredential, PasskeyError> {
    let client_data = ParsedClientData::from_base64(&reg_data.response.client_data_json)?;
    let attestation = AttestationObject::from_base64(&reg_data.response.attestation_object)?;
    let auth_data = AuthenticatorData::from_bytes(attestation.auth_data.clone())?;

    // Ordered validation, failing closed on the first mismatch.
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

    if client_data.type_ != "webauthn.create" {
        return Err(PasskeyError::CeremonyTypeMismatch);
    }

    let expected_hash = ring::digest::digest(&ring::digest::SHA256, WEBAUTHN_RP_ID.as_bytes());
    if auth_data.rp_id_hash != expected_hash.as_ref() {
        return Err(PasskeyError::RpIdHashMismatch);
    }

    if !auth_data.has_attested_credential_data() {
        return Err(PasskeyError::MissingCredentialData);
    }

    if !auth_data.is_user_present() {
        return Err(PasskeyError::UserNotPresent);
    }

    if *PASSKEY_USER_VERIFICATION == "required" && !auth_data.is_user_verified() {
        return Err(PasskeyError::UserNotVerified);
    }

    let existing = CredentialStore::get_credentials_by_user(user.id).await?;
    if existing.len() >= MAX_CREDENTIALS_PER_USER {
        tracing::warn!(
            user_id = user.id,
            count = existing.len(),
            max = MAX_CREDENTIALS_PER_USER,
            "registration refused: credential ceiling reached"
        );
        return Err(PasskeyError::TooManyCredentials);
    }

    let attested = auth_data.attested_credential()?;
    if attested.credential_id.is_empty()
        || attested.public_key.is_empty()
        || attested.public_key.len() < MIN_PUBLIC_KEY_LENGTH
    {
        return Err(PasskeyError::EmptyOrShortKeyMaterial);
    }

    // A credential id is never reassigned; an id already present anywhere
    // rejects the ceremony. Bound to someone else it is the louder event.
    if let Some(holder) = CredentialStore::get_credential(&attested.credential_id).await? {
        if holder.user_id == user.id {
            tracing::info!(user_id = user.id, "credential already registered for this user");
        } else {
            tracing::warn!(
                user_id = user.id,
                holder_id = holder.user_id,
                "attempted to register a credential belonging to another user"
            );
        }
        return Err(PasskeyError::DuplicateCredential);
    }

    let now = Utc::now();
    let credential = PasskeyCredential {
        credential_id: attested.credential_id,
        user_id: user.id,
        public_key: attested.public_key,
        attestation_type: attestation.fmt.clone(),
        aaguid: attested.aaguid,
        sign_count: auth_data.sign_count,
        clone_warning: false,
        flags: CredentialFlags {
            user_present: auth_data.is_user_present(),
            user_verified: auth_data.is_user_verified(),
            backup_eligible: auth_data.is_backup_eligible(),
            backup_state: auth_data.is_backed_up(),
        },
        transports: reg_data.response.transports.clone(),
        name: credential_name,
        last_used_at: None,
        created_at: now,
        updated_at: now,
    };

    CredentialStore::store_credential_and_drop_session(&credential, &session.id).await?;

    Ok(credential)
}
