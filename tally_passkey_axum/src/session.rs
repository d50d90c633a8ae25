use std::ops::Deref;

use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum_extra::TypedHeader;
use chrono::Utc;
use http::{StatusCode, request::Parts};

use tally_passkey::{SESSION_COOKIE_NAME, User, UserStore, WebSessionStore};

/// Session ids are 32 random bytes as lowercase hex. Anything else is
/// refused before it can reach the store layer.
pub(crate) fn is_valid_session_token(token: &str) -> bool {
    token.len() == 64
        && token
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// The authenticated account, resolved from the `session_id` cookie.
///
/// Use as an extractor on protected routes; requests without a valid,
/// unexpired session are rejected with 401.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

const UNAUTHORIZED: (StatusCode, &str) = (StatusCode::UNAUTHORIZED, "Unauthorized");

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cookies: TypedHeader<headers::Cookie> =
            parts.extract().await.map_err(|_| UNAUTHORIZED)?;

        let token = cookies.get(SESSION_COOKIE_NAME).ok_or(UNAUTHORIZED)?;
        if !is_valid_session_token(token) {
            return Err(UNAUTHORIZED);
        }

        let session = WebSessionStore::get_web_session(token)
            .await
            .map_err(|e| {
                tracing::error!("session lookup failed: {e}");
                UNAUTHORIZED
            })?
            .ok_or(UNAUTHORIZED)?;

        if !session.is_valid(Utc::now()) {
            return Err(UNAUTHORIZED);
        }

        let user = UserStore::get_user_by_id(session.user_id)
            .await
            .map_err(|e| {
                tracing::error!("user lookup failed: {e}");
                UNAUTHORIZED
            })?
            .ok_or(UNAUTHORIZED)?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_session_token_shape() {
        assert!(is_valid_session_token(&"a1".repeat(32)));
        assert!(is_valid_session_token(&"0".repeat(64)));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(!is_valid_session_token(""));
        assert!(!is_valid_session_token(&"a".repeat(63)));
        assert!(!is_valid_session_token(&"a".repeat(65)));
    }

    #[test]
    fn test_rejects_non_hex_and_uppercase() {
        assert!(!is_valid_session_token(&"g".repeat(64)));
        assert!(!is_valid_session_token(&"A".repeat(64)));
        // classic injection probes must never reach the store
        assert!(!is_valid_session_token("'; DROP TABLE sessions; --"));
        assert!(!is_valid_session_token(&format!("{}'", "a".repeat(63))));
    }
}
