use axum::Router;
use axum::extract::Json;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use axum_extra::TypedHeader;

use tally_passkey::{
    AuthenticationOptions, AuthenticatorResponse, ChallengeStore, PasskeyError,
    RegisterCredential, RegistrationOptions, SESSION_COOKIE_NAME, UserStore, WebSessionStore,
};

use crate::cookies::{
    WEBAUTHN_COOKIE_MAX_AGE, WEBAUTHN_COOKIE_NAME, header_clear_cookie, header_set_cookie,
};
use crate::error::{authentication_error_response, internal_error, registration_error_response};
use crate::session::{AuthUser, is_valid_session_token};

/// Routes for the passkey ceremonies and credential management. Nest
/// under the app's passkey prefix, e.g. `/passkey`.
pub fn router() -> Router {
    Router::new()
        .route("/register/start", post(handle_start_registration))
        .route("/register/finish", post(handle_finish_registration))
        .route("/auth/check", post(handle_passkey_check))
        .route("/auth/start", post(handle_start_login))
        .route("/auth/finish", post(handle_finish_login))
        .route("/credentials", get(handle_list_credentials))
        .route("/credentials/delete", post(handle_delete_credential))
}

#[derive(Deserialize, Debug)]
struct EmailRequest {
    email: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DeleteCredentialRequest {
    credential_id: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CredentialSummary {
    /// Hex-encoded credential id
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    has_passkey: bool,
}

#[derive(Serialize, Debug)]
struct LoginResponse {
    message: String,
    redirect: String,
}

fn normalized_email(raw: &str) -> Result<String, (StatusCode, String)> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Email is required".to_string()));
    }
    Ok(email)
}

fn ceremony_cookie(
    cookies: &Option<TypedHeader<headers::Cookie>>,
) -> Result<String, (StatusCode, String)> {
    let session_id = cookies
        .as_ref()
        .and_then(|c| c.get(WEBAUTHN_COOKIE_NAME))
        .ok_or((
            StatusCode::BAD_REQUEST,
            "No active passkey session".to_string(),
        ))?;

    // Reject anything that is not a well-formed token before it can be
    // used as a store lookup key
    if !is_valid_session_token(session_id) {
        return Err((StatusCode::BAD_REQUEST, "Invalid session".to_string()));
    }
    Ok(session_id.to_string())
}

/// POST /register/start. Authenticated. Returns creation options and
/// binds the ceremony to the browser via the `webauthn_session` cookie.
async fn handle_start_registration(
    user: AuthUser,
) -> Result<(HeaderMap, Json<RegistrationOptions>), (StatusCode, String)> {
    let credentials = tally_passkey::list_user_credentials(user.id)
        .await
        .map_err(internal_error)?;

    let (options, session_id) = tally_passkey::start_registration(&user.0, &credentials)
        .await
        .map_err(|e| registration_error_response(&e))?;

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        WEBAUTHN_COOKIE_NAME,
        &session_id,
        WEBAUTHN_COOKIE_MAX_AGE,
    )?;

    Ok((headers, Json(options)))
}

/// POST /register/finish. Authenticated. The optional X-Credential-Name
/// header labels the new passkey.
async fn handle_finish_registration(
    user: AuthUser,
    request_headers: HeaderMap,
    cookies: Option<TypedHeader<headers::Cookie>>,
    Json(reg_data): Json<RegisterCredential>,
) -> Result<(HeaderMap, Json<MessageResponse>), (StatusCode, String)> {
    let session_id = ceremony_cookie(&cookies)?;

    let credential_name = match request_headers.get("x-credential-name") {
        Some(value) => {
            let name = value
                .to_str()
                .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid credential name".to_string()))?
                .trim();
            if name.len() > 100 {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "Credential name too long (max 100 characters)".to_string(),
                ));
            }
            (!name.is_empty()).then(|| name.to_string())
        }
        None => None,
    };

    tally_passkey::finish_registration(&user.0, &session_id, credential_name, &reg_data)
        .await
        .map_err(|e| registration_error_response(&e))?;

    let mut headers = HeaderMap::new();
    header_clear_cookie(&mut headers, WEBAUTHN_COOKIE_NAME)?;

    Ok((
        headers,
        Json(MessageResponse {
            message: "Passkey registered successfully".to_string(),
        }),
    ))
}

/// POST /auth/check. Unauthenticated. Answers false for unknown emails
/// so account existence cannot be probed.
async fn handle_passkey_check(
    Json(request): Json<EmailRequest>,
) -> Result<Json<CheckResponse>, (StatusCode, String)> {
    let email = normalized_email(&request.email)?;

    let has_passkey = match UserStore::get_user_by_email(&email).await {
        Ok(Some(user)) => tally_passkey::user_has_passkeys(user.id)
            .await
            .unwrap_or(false),
        Ok(None) => false,
        Err(e) => {
            tracing::error!("passkey check lookup failed: {e}");
            false
        }
    };

    Ok(Json(CheckResponse { has_passkey }))
}

/// POST /auth/start. Unauthenticated, identified by email.
async fn handle_start_login(
    Json(request): Json<EmailRequest>,
) -> Result<(HeaderMap, Json<AuthenticationOptions>), (StatusCode, String)> {
    let email = normalized_email(&request.email)?;

    // Unknown emails get the same generic answer as a failed ceremony
    let user = UserStore::get_user_by_email(&email)
        .await
        .map_err(internal_error)?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Authentication failed".to_string(),
        ))?;

    let credentials = tally_passkey::list_user_credentials(user.id)
        .await
        .map_err(internal_error)?;

    let (options, session_id) = tally_passkey::start_authentication(&user, &credentials)
        .await
        .map_err(|e| authentication_error_response(&e))?;

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        WEBAUTHN_COOKIE_NAME,
        &session_id,
        WEBAUTHN_COOKIE_MAX_AGE,
    )?;

    Ok((headers, Json(options)))
}

/// POST /auth/finish. Unauthenticated. On success establishes the
/// general web session and clears the ceremony cookie.
async fn handle_finish_login(
    cookies: Option<TypedHeader<headers::Cookie>>,
    Json(auth_response): Json<AuthenticatorResponse>,
) -> Result<(HeaderMap, Json<LoginResponse>), (StatusCode, String)> {
    let session_id = ceremony_cookie(&cookies)?;

    // The ceremony session tells us which account is logging in
    let ceremony_session = ChallengeStore::get_session(&session_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::BAD_REQUEST, "Invalid session".to_string()))?;

    let user = UserStore::get_user_by_id(ceremony_session.user_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let credentials = tally_passkey::list_user_credentials(user.id)
        .await
        .map_err(internal_error)?;

    tally_passkey::finish_authentication(&user, &credentials, &session_id, &auth_response)
        .await
        .map_err(|e| authentication_error_response(&e))?;

    let web_session = WebSessionStore::create_web_session(user.id)
        .await
        .map_err(internal_error)?;
    let max_age = (web_session.expires_at - Utc::now()).num_seconds();

    let mut headers = HeaderMap::new();
    header_clear_cookie(&mut headers, WEBAUTHN_COOKIE_NAME)?;
    header_set_cookie(&mut headers, SESSION_COOKIE_NAME, &web_session.id, max_age)?;

    Ok((
        headers,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            redirect: "/dashboard".to_string(),
        }),
    ))
}

/// GET /credentials. Authenticated. Credential ids go out hex-encoded.
async fn handle_list_credentials(
    user: AuthUser,
) -> Result<Json<Vec<CredentialSummary>>, (StatusCode, String)> {
    let credentials = tally_passkey::list_user_credentials(user.id)
        .await
        .map_err(internal_error)?;

    let summaries = credentials
        .into_iter()
        .map(|credential| CredentialSummary {
            id: hex::encode(&credential.credential_id),
            name: credential
                .name
                .unwrap_or_else(|| "Unnamed Passkey".to_string()),
            created_at: credential.created_at,
            last_used_at: credential.last_used_at,
        })
        .collect();

    Ok(Json(summaries))
}

/// POST /credentials/delete. Authenticated, owner only.
async fn handle_delete_credential(
    user: AuthUser,
    Json(request): Json<DeleteCredentialRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let credential_id = hex::decode(&request.credential_id)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid credential ID".to_string()))?;

    tally_passkey::delete_user_credential(user.id, &credential_id)
        .await
        .map_err(|e| match e {
            PasskeyError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Credential not found".to_string())
            }
            PasskeyError::OwnershipMismatch => {
                (StatusCode::FORBIDDEN, "Unauthorized".to_string())
            }
            other => internal_error(other),
        })?;

    Ok(Json(MessageResponse {
        message: "Passkey deleted successfully".to_string(),
    }))
}
