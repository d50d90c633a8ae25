use chrono::{Duration, Utc};

use super::ceremony;
use super::challenge::{discard_session, load_ceremony_session};
use super::types::{AuthenticationOptions, AuthenticatorResponse};
use crate::passkey::config::PASSKEY_CHALLENGE_TIMEOUT;
use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::{ChallengeStore, CredentialStore};
use crate::passkey::types::{CeremonyType, ChallengeSession, PasskeyCredential};
use crate::userdb::User;
use crate::utils::gen_session_id;

/// Open a login ceremony for a user whose credentials are already loaded.
///
/// Refuses to issue a ceremony that can never succeed: a user without
/// passkeys gets `NoCredentials` so the caller can fall back to another
/// login method.
pub async fn start_authentication(
    user: &User,
    credentials: &[PasskeyCredential],
) -> Result<(AuthenticationOptions, String), PasskeyError> {
    if credentials.is_empty() {
        return Err(PasskeyError::NoCredentials);
    }

    let session_id = gen_session_id()?;
    let (options, challenge, user_verification) =
        ceremony::build_authentication_options(credentials)?;

    let now = Utc::now();
    let session = ChallengeSession {
        id: session_id.clone(),
        user_id: user.id,
        challenge,
        user_verification,
        ceremony_type: CeremonyType::Authentication,
        expires_at: now + Duration::seconds(*PASSKEY_CHALLENGE_TIMEOUT as i64),
        created_at: now,
    };
    ChallengeStore::create_session(&session).await?;

    tracing::debug!(user_id = user.id, "authentication ceremony started");
    Ok((options, session_id))
}

/// Complete a login ceremony: validate the session, delegate signature
/// verification, then apply ownership, clone detection and bookkeeping.
///
/// Returns the updated credential; establishing the follow-on web
/// session is the caller's business.
pub async fn finish_authentication(
    user: &User,
    credentials: &[PasskeyCredential],
    session_id: &str,
    auth_response: &AuthenticatorResponse,
) -> Result<PasskeyCredential, PasskeyError> {
    let session =
        load_ceremony_session(session_id, CeremonyType::Authentication, user.id).await?;

    match verify_and_record(user, credentials, &session, auth_response).await {
        Ok(credential) => {
            tracing::info!(
                user_id = user.id,
                name = credential.name.as_deref().unwrap_or("unnamed"),
                sign_count = credential.sign_count,
                clone_warning = credential.clone_warning,
                "passkey authentication successful"
            );
            Ok(credential)
        }
        Err(err) => {
            tracing::warn!(user_id = user.id, error = %err, "passkey authentication failed");
            discard_session(&session.id).await;
            Err(err)
        }
    }
}

async fn verify_and_record(
    user: &User,
    credentials: &[PasskeyCredential],
    session: &ChallengeSession,
    auth_response: &AuthenticatorResponse,
) -> Result<PasskeyCredential, PasskeyError> {
    let assertion = ceremony::verify_assertion(user, credentials, session, auth_response)?;

    let mut credential = CredentialStore::get_credential(&assertion.credential_id)
        .await?
        .ok_or_else(|| PasskeyError::NotFound("credential".to_string()))?;

    // The signature already checked out, but the stored row is the source
    // of truth for ownership: a credential id replayed against another
    // account's session context stops here.
    if credential.user_id != user.id {
        tracing::warn!(
            user_id = user.id,
            holder_id = credential.user_id,
            "credential ownership mismatch during authentication"
        );
        return Err(PasskeyError::OwnershipMismatch);
    }

    // Clone detection. A counter that fails to advance while nonzero
    // means a second copy of the private key may exist. Recorded, not
    // blocking; the flag is sticky.
    if assertion.sign_count != 0 && assertion.sign_count <= credential.sign_count {
        credential.clone_warning = true;
        tracing::warn!(
            user_id = user.id,
            stored_count = credential.sign_count,
            asserted_count = assertion.sign_count,
            "possible credential cloning detected"
        );
    }

    let now = Utc::now();
    credential.sign_count = assertion.sign_count;
    credential.flags.backup_state = assertion.flags.backup_state;
    credential.last_used_at = Some(now);
    credential.updated_at = now;

    CredentialStore::update_credential_and_drop_session(&credential, &session.id).await?;

    Ok(credential)
}
