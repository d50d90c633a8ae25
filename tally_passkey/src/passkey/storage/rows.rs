//! Row representations: the serialization contract between the domain
//! structs and the database. Byte fields travel as base64url TEXT,
//! transport hints as a JSON array; nothing outside this module encodes
//! or decodes a credential column.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyType, ChallengeSession, CredentialFlags, PasskeyCredential};
use crate::utils::{base64url_decode, base64url_encode};

#[derive(Debug, FromRow)]
pub(super) struct CredentialRow {
    pub(super) credential_id: String,
    pub(super) user_id: i64,
    pub(super) public_key: String,
    pub(super) attestation_type: String,
    pub(super) aaguid: String,
    pub(super) sign_count: i64,
    pub(super) clone_warning: bool,
    pub(super) flags_user_present: bool,
    pub(super) flags_user_verified: bool,
    pub(super) flags_backup_eligible: bool,
    pub(super) flags_backup_state: bool,
    pub(super) transports: String,
    pub(super) credential_name: Option<String>,
    pub(super) last_used_at: Option<DateTime<Utc>>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
}

impl From<&PasskeyCredential> for CredentialRow {
    fn from(credential: &PasskeyCredential) -> Self {
        Self {
            credential_id: base64url_encode(&credential.credential_id),
            user_id: credential.user_id,
            public_key: base64url_encode(&credential.public_key),
            attestation_type: credential.attestation_type.clone(),
            aaguid: base64url_encode(&credential.aaguid),
            sign_count: credential.sign_count as i64,
            clone_warning: credential.clone_warning,
            flags_user_present: credential.flags.user_present,
            flags_user_verified: credential.flags.user_verified,
            flags_backup_eligible: credential.flags.backup_eligible,
            flags_backup_state: credential.flags.backup_state,
            transports: serde_json::to_string(&credential.transports)
                .unwrap_or_else(|_| "[]".to_string()),
            credential_name: credential.name.clone(),
            last_used_at: credential.last_used_at,
            created_at: credential.created_at,
            updated_at: credential.updated_at,
        }
    }
}

impl TryFrom<CredentialRow> for PasskeyCredential {
    type Error = PasskeyError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(Self {
            credential_id: base64url_decode(&row.credential_id)
                .map_err(|e| PasskeyError::Storage(e.to_string()))?,
            user_id: row.user_id,
            public_key: base64url_decode(&row.public_key)
                .map_err(|e| PasskeyError::Storage(e.to_string()))?,
            attestation_type: row.attestation_type,
            aaguid: base64url_decode(&row.aaguid)
                .map_err(|e| PasskeyError::Storage(e.to_string()))?,
            sign_count: row.sign_count as u32,
            clone_warning: row.clone_warning,
            flags: CredentialFlags {
                user_present: row.flags_user_present,
                user_verified: row.flags_user_verified,
                backup_eligible: row.flags_backup_eligible,
                backup_state: row.flags_backup_state,
            },
            transports: serde_json::from_str(&row.transports)
                .map_err(|e| PasskeyError::Storage(e.to_string()))?,
            name: row.credential_name,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Encode a raw credential id the way the credential_id column stores it.
pub(super) fn encode_credential_id(credential_id: &[u8]) -> String {
    base64url_encode(credential_id)
}

#[derive(Debug, FromRow)]
pub(super) struct SessionRow {
    pub(super) id: String,
    pub(super) user_id: i64,
    pub(super) challenge: String,
    pub(super) user_verification: String,
    pub(super) ceremony_type: String,
    pub(super) expires_at: DateTime<Utc>,
    pub(super) created_at: DateTime<Utc>,
}

impl From<&ChallengeSession> for SessionRow {
    fn from(session: &ChallengeSession) -> Self {
        Self {
            id: session.id.clone(),
            user_id: session.user_id,
            challenge: session.challenge.clone(),
            user_verification: session.user_verification.clone(),
            ceremony_type: session.ceremony_type.as_str().to_string(),
            expires_at: session.expires_at,
            created_at: session.created_at,
        }
    }
}

impl TryFrom<SessionRow> for ChallengeSession {
    type Error = PasskeyError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let ceremony_type = match row.ceremony_type.as_str() {
            "registration" => CeremonyType::Registration,
            "authentication" => CeremonyType::Authentication,
            other => {
                return Err(PasskeyError::Storage(format!(
                    "unknown ceremony type in store: {other}"
                )));
            }
        };
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            challenge: row.challenge,
            user_verification: row.user_verification,
            ceremony_type,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_credential() -> PasskeyCredential {
        let now = Utc::now();
        PasskeyCredential {
            credential_id: vec![1, 2, 3, 4],
            user_id: 77,
            public_key: vec![4; 65],
            attestation_type: "none".into(),
            aaguid: vec![0; 16],
            sign_count: 9,
            clone_warning: false,
            flags: CredentialFlags {
                user_present: true,
                user_verified: true,
                backup_eligible: false,
                backup_state: false,
            },
            transports: vec!["internal".into(), "hybrid".into()],
            name: Some("laptop".into()),
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_credential_row_roundtrip() {
        let credential = sample_credential();
        let row = CredentialRow::from(&credential);
        assert_eq!(row.transports, r#"["internal","hybrid"]"#);

        let back = PasskeyCredential::try_from(row).unwrap();
        assert_eq!(back, credential);
    }

    #[test]
    fn test_session_row_rejects_unknown_ceremony_type() {
        let row = SessionRow {
            id: "a".repeat(64),
            user_id: 1,
            challenge: "c".into(),
            user_verification: "required".into(),
            ceremony_type: "attestation".into(),
            expires_at: Utc::now(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            ChallengeSession::try_from(row),
            Err(PasskeyError::Storage(_))
        ));
    }
}
