use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A logged-in browser session, created after a successful passkey (or
/// one-time code) login. Distinct from the short-lived ceremony sessions
/// the passkey module issues.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct WebSession {
    /// Opaque bearer token, 64 lowercase hex characters
    pub id: String,
    /// Account this session belongs to
    pub user_id: i64,
    /// Absolute expiry, fixed at creation
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WebSession {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_valid_until_expiry() {
        let now = Utc::now();
        let session = WebSession {
            id: "a".repeat(64),
            user_id: 1,
            expires_at: now + Duration::hours(24),
            created_at: now,
        };
        assert!(session.is_valid(now));
        assert!(!session.is_valid(now + Duration::hours(25)));
        // the boundary instant is already expired
        assert!(!session.is_valid(session.expires_at));
    }
}
