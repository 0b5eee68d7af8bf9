//! OTP issuance and verification: the entry point of every login.
//!
//! Flow Overview:
//! 1) `send-otp` creates a hashed challenge for the normalized phone.
//! 2) `verify-otp` consumes the challenge, resolves or creates the user, and
//!    mints an access/refresh token pair.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{AuthError, ErrorBody};
use super::phone::{normalize_phone, valid_phone};
use super::rate_limit::RateLimitDecision;
use super::session::issue_refresh_token;
use super::state::AuthState;
use super::store::{DeviceInfo, NewOtpChallenge, Role, UserRecord};
use super::types::{SendOtpRequest, SendOtpResponse, SessionResponse, UserResponse, VerifyOtpRequest};
use super::utils::{extract_client_ip, generate_numeric_code, hash_secret, verify_secret};
use super::jwt;

/// Outcome of issuing a challenge.
#[derive(Debug)]
pub(crate) struct ChallengeIssued {
    pub expires_in_seconds: i64,
    pub debug_code: Option<String>,
}

/// Create an OTP challenge for a normalized phone number.
///
/// At most one live challenge per phone: a request while one is pending is a
/// conflict that reports the remaining wait.
pub(crate) async fn start_challenge(
    state: &AuthState,
    phone: &str,
) -> Result<ChallengeIssued, AuthError> {
    if let Some(existing) = state.otp_store().find_live(phone).await? {
        let remaining_seconds = (existing.expires_at - Utc::now()).num_seconds().max(0);
        let wait_minutes = (remaining_seconds + 59) / 60;
        return Err(AuthError::Conflict(format!(
            "OTP already sent. Please wait {wait_minutes} minute(s) before requesting again."
        )));
    }

    let code = if state.config().otp_dummy_mode() {
        state.config().otp_dummy_code().to_string()
    } else {
        generate_numeric_code(state.config().otp_length())
    };
    let code_hash = hash_secret(&code)?;
    let expires_at = Utc::now() + chrono::Duration::minutes(state.config().otp_ttl_minutes());

    state
        .otp_store()
        .insert(NewOtpChallenge {
            phone: phone.to_string(),
            code_hash,
            expires_at,
        })
        .await?;

    info!(%phone, "OTP challenge created");
    // An SMS sender would hand the code off here; delivery is out of scope.

    Ok(ChallengeIssued {
        expires_in_seconds: state.config().otp_ttl_minutes() * 60,
        debug_code: state.config().otp_dummy_mode().then_some(code),
    })
}

/// Consume the live challenge for a phone by matching the candidate code.
///
/// The attempt-limit check runs before the hash comparison, so an exhausted
/// challenge is discarded without burning another hash verification.
pub(crate) async fn verify_challenge(
    state: &AuthState,
    phone: &str,
    code: &str,
) -> Result<(), AuthError> {
    let Some(challenge) = state.otp_store().find_live(phone).await? else {
        return Err(AuthError::Unauthorized("Invalid or expired OTP".to_string()));
    };

    let max_attempts = state.config().otp_max_attempts();
    if challenge.attempts >= max_attempts {
        state.otp_store().delete(challenge.id).await?;
        return Err(AuthError::Unauthorized(
            "Maximum OTP attempts exceeded. Please request a new OTP.".to_string(),
        ));
    }

    if !verify_secret(code, &challenge.code_hash) {
        let Some(attempts) = state.otp_store().increment_attempts(challenge.id).await? else {
            // Challenge vanished between lookup and update; same as no challenge.
            return Err(AuthError::Unauthorized("Invalid or expired OTP".to_string()));
        };
        let remaining = (max_attempts - attempts).max(0);
        return Err(AuthError::Unauthorized(format!(
            "Invalid OTP. {remaining} attempts remaining."
        )));
    }

    state.otp_store().delete(challenge.id).await?;
    Ok(())
}

/// Full login: verify the challenge, resolve or create the user, and mint a
/// token pair.
pub(crate) async fn login(
    state: &AuthState,
    phone: &str,
    code: &str,
    device: DeviceInfo,
) -> Result<(String, String, UserRecord), AuthError> {
    verify_challenge(state, phone, code).await?;

    let user = match state.users().find_by_phone(phone).await? {
        Some(user) if user.phone_verified => user,
        Some(user) => state.users().mark_phone_verified(user.id).await?,
        None => {
            let user = state.users().create(phone, Role::Vendor).await?;
            info!(user_id = %user.id, %phone, "new user created");
            user
        }
    };

    let claims = jwt::AccessTokenClaims::new(&user, state.config().access_token_ttl_seconds());
    let access_token = jwt::sign(&claims, state.config().signing_secret())?;
    let refresh_token = issue_refresh_token(state, user.id, device).await?;

    info!(user_id = %user.id, "user logged in");
    Ok((access_token, refresh_token, user))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP challenge created", body = SendOtpResponse),
        (status = 400, description = "Missing phone number", body = ErrorBody),
        (status = 409, description = "A live challenge already exists for this phone", body = ErrorBody),
        (status = 429, description = "Too many OTP requests for this phone", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn send_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Phone number is required".to_string()).into_response();
    };
    if request.phone.trim().is_empty() {
        return AuthError::Validation("Phone number is required".to_string()).into_response();
    }

    let phone = normalize_phone(&request.phone);
    if !valid_phone(&phone) {
        // Best-effort normalization is accepted; the shape check only informs.
        debug!(%phone, "phone failed E.164 shape check");
    }

    if auth_state.rate_limiter().check(&phone) == RateLimitDecision::Limited {
        warn!(%phone, "send-otp rate limited");
        return AuthError::TooManyRequests(
            "Too many OTP requests. Please try again later.".to_string(),
        )
        .into_response();
    }

    match start_challenge(&auth_state, &phone).await {
        Ok(issued) => (
            StatusCode::OK,
            Json(SendOtpResponse {
                message: "OTP sent successfully".to_string(),
                expires_in: issued.expires_in_seconds,
                debug_otp: issued.debug_code,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified; session issued", body = SessionResponse),
        (status = 400, description = "Missing phone number or code", body = ErrorBody),
        (status = 401, description = "Wrong, expired, or exhausted code", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Phone number and OTP are required".to_string())
            .into_response();
    };
    if request.phone.trim().is_empty() || request.otp.trim().is_empty() {
        return AuthError::Validation("Phone number and OTP are required".to_string())
            .into_response();
    }

    let phone = normalize_phone(&request.phone);
    let device = DeviceInfo {
        device_id: request.device_id.clone(),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        ip: extract_client_ip(&headers),
    };

    match login(&auth_state, &phone, request.otp.trim(), device).await {
        Ok((access_token, refresh_token, user)) => (
            StatusCode::OK,
            Json(SessionResponse {
                access_token,
                refresh_token,
                user: UserResponse::from(&user),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
