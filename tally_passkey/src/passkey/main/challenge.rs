//! Ceremony session handling shared by both orchestrators.

use chrono::Utc;

use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::ChallengeStore;
use crate::passkey::types::{CeremonyType, ChallengeSession};

/// Load a ceremony session and check it may finish this ceremony:
/// it must exist, be unexpired, match the ceremony type, and match the
/// user. Every violation collapses into `InvalidSession` so a caller
/// cannot distinguish an expired session from one that never existed.
///
/// On a validation failure the session is discarded: sessions are
/// single-use whether the ceremony succeeds or not.
pub(super) async fn load_ceremony_session(
    session_id: &str,
    ceremony_type: CeremonyType,
    user_id: i64,
) -> Result<ChallengeSession, PasskeyError> {
    let session = ChallengeStore::get_session(session_id)
        .await?
        .ok_or(PasskeyError::InvalidSession)?;

    if !session.is_valid(Utc::now())
        || session.ceremony_type != ceremony_type
        || session.user_id != user_id
    {
        tracing::warn!(
            user_id,
            session_ceremony = session.ceremony_type.as_str(),
            requested_ceremony = ceremony_type.as_str(),
            "rejecting ceremony session"
        );
        discard_session(session_id).await;
        return Err(PasskeyError::InvalidSession);
    }

    Ok(session)
}

/// Best-effort session removal on failure paths. A delete that fails is
/// only logged: the row still expires, and the ceremony error already on
/// its way out matters more.
pub(super) async fn discard_session(session_id: &str) {
    if let Err(e) = ChallengeStore::delete_session(session_id).await {
        tracing::warn!("Failed to discard ceremony session {}: {}", session_id, e);
    }
}
