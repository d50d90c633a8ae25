use chrono::{DateTime, Utc};

use crate::storage::GENERIC_DATA_STORE;

use super::postgres;
use super::sqlite;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{ChallengeSession, PasskeyCredential};

/// Persistent store for registered passkeys, one row per credential.
pub struct CredentialStore;

/// Persistent store for ephemeral ceremony state, keyed by the opaque
/// session id.
pub struct ChallengeStore;

impl CredentialStore {
    pub(crate) async fn init() -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_credential_tables_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_credential_tables_postgres(pool).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Insert a new credential. Fails on a duplicate credential id; the
    /// id column is the primary key and is never reassigned.
    pub async fn store_credential(credential: &PasskeyCredential) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::store_credential_sqlite(pool, credential).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::store_credential_postgres(pool, credential).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub async fn get_credential(
        credential_id: &[u8],
    ) -> Result<Option<PasskeyCredential>, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_credential_sqlite(pool, credential_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_credential_postgres(pool, credential_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// All credentials owned by the user, newest first.
    pub async fn get_credentials_by_user(
        user_id: i64,
    ) -> Result<Vec<PasskeyCredential>, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_credentials_by_user_sqlite(pool, user_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_credentials_by_user_postgres(pool, user_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub async fn update_credential(credential: &PasskeyCredential) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::update_credential_sqlite(pool, credential).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::update_credential_postgres(pool, credential).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub async fn delete_credential(credential_id: &[u8]) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::delete_credential_sqlite(pool, credential_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::delete_credential_postgres(pool, credential_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Insert the credential and delete the ceremony session as one
    /// transaction. The session delete is non-critical: if it fails,
    /// the credential write still commits and the stray session is left
    /// to expire.
    pub async fn store_credential_and_drop_session(
        credential: &PasskeyCredential,
        session_id: &str,
    ) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::store_credential_and_drop_session_sqlite(pool, credential, session_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::store_credential_and_drop_session_postgres(pool, credential, session_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Update the credential and delete the ceremony session as one
    /// transaction, with the same non-critical session delete.
    pub async fn update_credential_and_drop_session(
        credential: &PasskeyCredential,
        session_id: &str,
    ) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::update_credential_and_drop_session_sqlite(pool, credential, session_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::update_credential_and_drop_session_postgres(pool, credential, session_id)
                .await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }
}

impl ChallengeStore {
    pub(crate) async fn init() -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_session_tables_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_session_tables_postgres(pool).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Insert a new ceremony session. The caller supplies the
    /// pre-generated id; an existing id is an error, never an overwrite.
    pub async fn create_session(session: &ChallengeSession) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_session_sqlite(pool, session).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_session_postgres(pool, session).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Plain lookup. Expiry is not checked here: callers check
    /// `is_valid` so one policy decides what "expired" means everywhere.
    pub async fn get_session(session_id: &str) -> Result<Option<ChallengeSession>, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_session_sqlite(pool, session_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_session_postgres(pool, session_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub async fn delete_session(session_id: &str) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::delete_session_sqlite(pool, session_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::delete_session_postgres(pool, session_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Storage hygiene: remove sessions whose expiry has passed. Run from
    /// a scheduler; correctness never depends on it.
    pub async fn delete_expired_sessions(now: DateTime<Utc>) -> Result<u64, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::delete_expired_sessions_sqlite(pool, now).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::delete_expired_sessions_postgres(pool, now).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::types::{CeremonyType, CredentialFlags};
    use crate::test_utils::init_test_environment;
    use crate::userdb::{User, UserStore};
    use chrono::Duration;
    use serial_test::serial;

    async fn seed_user(id: i64) {
        let user = User::new(id, format!("user{id}"), format!("User {id}"), None);
        UserStore::upsert_user(user).await.unwrap();
    }

    fn credential(id: u8, user_id: i64) -> PasskeyCredential {
        let now = Utc::now();
        PasskeyCredential {
            credential_id: vec![id; 16],
            user_id,
            public_key: vec![4; 65],
            attestation_type: "none".into(),
            aaguid: vec![0; 16],
            sign_count: 0,
            clone_warning: false,
            flags: CredentialFlags {
                user_present: true,
                user_verified: true,
                backup_eligible: true,
                backup_state: true,
            },
            transports: vec!["internal".into()],
            name: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn session(id_fill: char, user_id: i64, ceremony_type: CeremonyType) -> ChallengeSession {
        let now = Utc::now();
        ChallengeSession {
            id: id_fill.to_string().repeat(64),
            user_id,
            challenge: "test-challenge".into(),
            user_verification: "required".into(),
            ceremony_type,
            expires_at: now + Duration::minutes(5),
            created_at: now,
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_credential_crud() {
        init_test_environment().await;
        seed_user(500).await;

        let cred = credential(0xA1, 500);
        CredentialStore::store_credential(&cred).await.unwrap();

        let loaded = CredentialStore::get_credential(&cred.credential_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.user_id, 500);
        assert_eq!(loaded.public_key, cred.public_key);

        let mut updated = loaded.clone();
        updated.sign_count = 3;
        updated.clone_warning = true;
        updated.last_used_at = Some(Utc::now());
        CredentialStore::update_credential(&updated).await.unwrap();

        let reloaded = CredentialStore::get_credential(&cred.credential_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.sign_count, 3);
        assert!(reloaded.clone_warning);
        assert!(reloaded.last_used_at.is_some());

        CredentialStore::delete_credential(&cred.credential_id)
            .await
            .unwrap();
        assert!(
            CredentialStore::get_credential(&cred.credential_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_duplicate_credential_id_insert_fails() {
        init_test_environment().await;
        seed_user(501).await;
        seed_user(502).await;

        let cred = credential(0xA2, 501);
        CredentialStore::store_credential(&cred).await.unwrap();

        // Same id bound to a different user must be refused by the store
        let clone = PasskeyCredential {
            user_id: 502,
            ..cred.clone()
        };
        assert!(CredentialStore::store_credential(&clone).await.is_err());

        CredentialStore::delete_credential(&cred.credential_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_credentials_by_user_newest_first() {
        init_test_environment().await;
        seed_user(503).await;

        let older = PasskeyCredential {
            created_at: Utc::now() - Duration::minutes(10),
            ..credential(0xA3, 503)
        };
        let newer = credential(0xA4, 503);
        CredentialStore::store_credential(&older).await.unwrap();
        CredentialStore::store_credential(&newer).await.unwrap();

        let list = CredentialStore::get_credentials_by_user(503).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].credential_id, newer.credential_id);

        CredentialStore::delete_credential(&older.credential_id)
            .await
            .unwrap();
        CredentialStore::delete_credential(&newer.credential_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_session_create_is_not_an_upsert() {
        init_test_environment().await;

        let s = session('b', 504, CeremonyType::Registration);
        ChallengeStore::create_session(&s).await.unwrap();
        assert!(ChallengeStore::create_session(&s).await.is_err());

        ChallengeStore::delete_session(&s.id).await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_store_credential_and_drop_session() {
        init_test_environment().await;
        seed_user(505).await;

        let s = session('c', 505, CeremonyType::Registration);
        ChallengeStore::create_session(&s).await.unwrap();

        let cred = credential(0xA5, 505);
        CredentialStore::store_credential_and_drop_session(&cred, &s.id)
            .await
            .unwrap();

        assert!(
            CredentialStore::get_credential(&cred.credential_id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(ChallengeStore::get_session(&s.id).await.unwrap().is_none());

        CredentialStore::delete_credential(&cred.credential_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_combined_write_commits_without_a_session() {
        init_test_environment().await;
        seed_user(506).await;

        // The session is already gone; the credential write must still land
        let cred = credential(0xA6, 506);
        CredentialStore::store_credential_and_drop_session(&cred, &"d".repeat(64))
            .await
            .unwrap();

        assert!(
            CredentialStore::get_credential(&cred.credential_id)
                .await
                .unwrap()
                .is_some()
        );

        CredentialStore::delete_credential(&cred.credential_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_update_credential_and_drop_session() {
        init_test_environment().await;
        seed_user(507).await;

        let cred = credential(0xA7, 507);
        CredentialStore::store_credential(&cred).await.unwrap();

        let s = session('e', 507, CeremonyType::Authentication);
        ChallengeStore::create_session(&s).await.unwrap();

        let updated = PasskeyCredential {
            sign_count: 42,
            ..cred.clone()
        };
        CredentialStore::update_credential_and_drop_session(&updated, &s.id)
            .await
            .unwrap();

        let reloaded = CredentialStore::get_credential(&cred.credential_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.sign_count, 42);
        assert!(ChallengeStore::get_session(&s.id).await.unwrap().is_none());

        CredentialStore::delete_credential(&cred.credential_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_expired_session_sweep() {
        init_test_environment().await;

        let mut stale = session('f', 508, CeremonyType::Authentication);
        stale.expires_at = Utc::now() - Duration::minutes(1);
        let fresh = session('0', 508, CeremonyType::Authentication);

        ChallengeStore::create_session(&stale).await.unwrap();
        ChallengeStore::create_session(&fresh).await.unwrap();

        let removed = ChallengeStore::delete_expired_sessions(Utc::now())
            .await
            .unwrap();
        assert!(removed >= 1);

        assert!(
            ChallengeStore::get_session(&stale.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            ChallengeStore::get_session(&fresh.id)
                .await
                .unwrap()
                .is_some()
        );

        ChallengeStore::delete_session(&fresh.id).await.unwrap();
    }
}
