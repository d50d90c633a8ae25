use http::StatusCode;
use http::header::{HeaderMap, SET_COOKIE};

/// Cookie binding a browser to its in-flight ceremony.
pub(crate) const WEBAUTHN_COOKIE_NAME: &str = "webauthn_session";

/// Ceremony cookie lifetime in seconds; matches the challenge session TTL.
pub(crate) const WEBAUTHN_COOKIE_MAX_AGE: i64 = 300;

pub(crate) fn header_set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    max_age: i64,
) -> Result<(), (StatusCode, String)> {
    let cookie = format!("{name}={value}; SameSite=Lax; Secure; HttpOnly; Path=/; Max-Age={max_age}");
    headers.append(
        SET_COOKIE,
        cookie.parse().map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to set cookie".to_string(),
            )
        })?,
    );
    Ok(())
}

/// Expire a cookie immediately.
pub(crate) fn header_clear_cookie(
    headers: &mut HeaderMap,
    name: &str,
) -> Result<(), (StatusCode, String)> {
    header_set_cookie(headers, name, "", 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cookie_attributes() {
        let mut headers = HeaderMap::new();
        header_set_cookie(&mut headers, WEBAUTHN_COOKIE_NAME, "abc123", 300).unwrap();

        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("webauthn_session=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=300"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let mut headers = HeaderMap::new();
        header_clear_cookie(&mut headers, WEBAUTHN_COOKIE_NAME).unwrap();

        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("webauthn_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
