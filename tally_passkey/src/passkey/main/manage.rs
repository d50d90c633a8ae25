//! Credential management outside the ceremonies: listing, deletion with
//! an ownership gate, the passkey presence check, and the session
//! janitor hook.

use chrono::Utc;

use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::{ChallengeStore, CredentialStore};
use crate::passkey::types::PasskeyCredential;

/// All passkeys the user has registered, newest first.
pub async fn list_user_credentials(user_id: i64) -> Result<Vec<PasskeyCredential>, PasskeyError> {
    CredentialStore::get_credentials_by_user(user_id).await
}

/// Whether the user can log in with a passkey at all. Used by the login
/// page to decide which flow to offer.
pub async fn user_has_passkeys(user_id: i64) -> Result<bool, PasskeyError> {
    Ok(!CredentialStore::get_credentials_by_user(user_id)
        .await?
        .is_empty())
}

/// Delete one of the user's credentials. Only the owner may delete a
/// credential; a known id owned by someone else is refused.
pub async fn delete_user_credential(
    user_id: i64,
    credential_id: &[u8],
) -> Result<(), PasskeyError> {
    let credential = CredentialStore::get_credential(credential_id)
        .await?
        .ok_or_else(|| PasskeyError::NotFound("credential".to_string()))?;

    if credential.user_id != user_id {
        tracing::warn!(
            user_id,
            holder_id = credential.user_id,
            "refused to delete a credential owned by another user"
        );
        return Err(PasskeyError::OwnershipMismatch);
    }

    CredentialStore::delete_credential(credential_id).await?;
    tracing::info!(
        user_id,
        name = credential.name.as_deref().unwrap_or("unnamed"),
        "passkey deleted"
    );
    Ok(())
}

/// Remove expired, unconsumed ceremony sessions. Meant for a periodic
/// scheduler; returns how many rows went away.
pub async fn cleanup_expired_sessions() -> Result<u64, PasskeyError> {
    let removed = ChallengeStore::delete_expired_sessions(Utc::now()).await?;
    if removed > 0 {
        tracing::debug!(removed, "swept expired ceremony sessions");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::types::CredentialFlags;
    use crate::test_utils::init_test_environment;
    use crate::userdb::{User, UserStore};
    use serial_test::serial;

    async fn seed_user(id: i64) {
        let user = User::new(id, format!("user{id}"), format!("User {id}"), None);
        UserStore::upsert_user(user).await.unwrap();
    }

    async fn store_credential(id: &[u8], user_id: i64) -> PasskeyCredential {
        let now = Utc::now();
        let credential = PasskeyCredential {
            credential_id: id.to_vec(),
            user_id,
            public_key: vec![4; 65],
            attestation_type: "none".into(),
            aaguid: vec![0; 16],
            sign_count: 0,
            clone_warning: false,
            flags: CredentialFlags::default(),
            transports: vec![],
            name: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        CredentialStore::store_credential(&credential).await.unwrap();
        credential
    }

    #[tokio::test]
    #[serial]
    async fn test_has_passkeys_and_listing() {
        init_test_environment().await;
        seed_user(900).await;

        assert!(!user_has_passkeys(900).await.unwrap());

        let credential = store_credential(b"manage-1", 900).await;
        assert!(user_has_passkeys(900).await.unwrap());
        assert_eq!(list_user_credentials(900).await.unwrap().len(), 1);

        CredentialStore::delete_credential(&credential.credential_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_delete_requires_ownership() {
        init_test_environment().await;
        seed_user(901).await;

        let credential = store_credential(b"manage-2", 901).await;

        assert!(matches!(
            delete_user_credential(902, &credential.credential_id).await,
            Err(PasskeyError::OwnershipMismatch)
        ));
        assert!(matches!(
            delete_user_credential(901, b"manage-unknown").await,
            Err(PasskeyError::NotFound(_))
        ));

        delete_user_credential(901, &credential.credential_id)
            .await
            .unwrap();
        assert!(!user_has_passkeys(901).await.unwrap());
    }
}
