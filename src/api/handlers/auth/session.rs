//! Refresh-token lifecycle: issuance, rotation, revocation, and the
//! authenticated profile endpoint.
//!
//! Plaintext refresh tokens have the shape `<record-id>.<secret>`. The id is
//! not a secret; it only lets resolution hit an indexed lookup instead of
//! scanning every live digest. Authority comes from the secret half, which is
//! checked against the stored argon2 digest.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{AuthError, ErrorBody};
use super::jwt;
use super::state::AuthState;
use super::store::{DeviceInfo, NewRefreshToken, RefreshTokenRecord, UserRecord};
use super::types::{
    LogoutRequest, MeResponse, MessageResponse, RefreshRequest, RefreshResponse, UserResponse,
};
use super::utils::{generate_refresh_bundle, hash_secret, verify_secret};

fn parse_refresh_token(plaintext: &str) -> Option<(Uuid, &str)> {
    let (id, secret) = plaintext.split_once('.')?;
    if secret.is_empty() {
        return None;
    }
    let id = Uuid::parse_str(id).ok()?;
    Some((id, secret))
}

/// Issue a refresh token for a user. The returned plaintext is the only copy
/// that will ever exist; storage keeps the digest.
pub(crate) async fn issue_refresh_token(
    state: &AuthState,
    user_id: Uuid,
    device: DeviceInfo,
) -> Result<String, AuthError> {
    let bundle = generate_refresh_bundle(state.config().refresh_token_ttl_days())?;
    let token_hash = hash_secret(&bundle.secret)?;
    let record = state
        .refresh_store()
        .insert(NewRefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            expires_at: bundle.expires_at,
            device,
        })
        .await?;
    Ok(format!("{}.{}", record.id.as_simple(), bundle.secret))
}

/// Resolve a plaintext refresh token to its active record.
///
/// Malformed input, unknown ids, revoked or expired records, and digest
/// mismatches are deliberately indistinguishable.
pub(crate) async fn resolve_refresh_token(
    state: &AuthState,
    plaintext: &str,
) -> Result<Option<RefreshTokenRecord>, AuthError> {
    let Some((id, secret)) = parse_refresh_token(plaintext) else {
        return Ok(None);
    };
    let Some(record) = state.refresh_store().find_active(id).await? else {
        return Ok(None);
    };
    if verify_secret(secret, &record.token_hash) {
        Ok(Some(record))
    } else {
        Ok(None)
    }
}

/// Rotate a refresh token and mint a fresh access token.
///
/// The consumed token is dead on success; callers must discard it. Under a
/// concurrent refresh of the same token, exactly one caller succeeds.
pub(crate) async fn refresh_session(
    state: &AuthState,
    plaintext: &str,
) -> Result<(String, String), AuthError> {
    let Some(record) = resolve_refresh_token(state, plaintext).await? else {
        return Err(AuthError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    };

    let Some(user) = state.users().find_by_id(record.user_id).await? else {
        return Err(AuthError::Unauthorized("User not found".to_string()));
    };

    let bundle = generate_refresh_bundle(state.config().refresh_token_ttl_days())?;
    let token_hash = hash_secret(&bundle.secret)?;
    let replacement = NewRefreshToken {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash,
        expires_at: bundle.expires_at,
        device: record.device.clone(),
    };

    let Some(new_record) = state.refresh_store().rotate(record.id, replacement).await? else {
        // A concurrent rotation won; the token we resolved is already dead.
        return Err(AuthError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    };

    let claims = jwt::AccessTokenClaims::new(&user, state.config().access_token_ttl_seconds());
    let access_token = jwt::sign(&claims, state.config().signing_secret())?;

    info!(user_id = %user.id, "access token refreshed");
    Ok((
        access_token,
        format!("{}.{}", new_record.id.as_simple(), bundle.secret),
    ))
}

/// Revoke the session behind a refresh token. Unknown tokens succeed too:
/// logout is idempotent and must not leak whether a token existed.
pub(crate) async fn logout_session(state: &AuthState, plaintext: &str) -> Result<(), AuthError> {
    if let Some(record) = resolve_refresh_token(state, plaintext).await? {
        state.refresh_store().revoke(record.id).await?;
        info!(user_id = %record.user_id, "user logged out");
    }
    Ok(())
}

/// Resolve the bearer access token into the current user.
pub(crate) async fn current_user(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<UserRecord, AuthError> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(AuthError::Unauthorized("No token provided".to_string()));
    };

    let claims = jwt::verify(&token, state.config().signing_secret()).map_err(|err| match err {
        jwt::TokenError::Expired => AuthError::Unauthorized("Token expired".to_string()),
        jwt::TokenError::Invalid => AuthError::Unauthorized("Invalid token".to_string()),
    })?;

    let Some(user_id) = claims.user_id() else {
        return Err(AuthError::Unauthorized("Invalid token".to_string()));
    };
    let Some(user) = state.users().find_by_id(user_id).await? else {
        return Err(AuthError::Unauthorized("User not found".to_string()));
    };
    Ok(user)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair; the old refresh token is dead", body = RefreshResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Unknown, rotated, or expired refresh token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Refresh token is required".to_string()).into_response();
    };
    if request.refresh_token.trim().is_empty() {
        return AuthError::Validation("Refresh token is required".to_string()).into_response();
    }

    match refresh_session(&auth_state, request.refresh_token.trim()).await {
        Ok((access_token, refresh_token)) => (
            StatusCode::OK,
            Json(RefreshResponse {
                access_token,
                refresh_token,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session revoked (idempotent)", body = MessageResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LogoutRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Refresh token is required".to_string()).into_response();
    };
    if request.refresh_token.trim().is_empty() {
        return AuthError::Validation("Refresh token is required".to_string()).into_response();
    }

    match logout_session(&auth_state, request.refresh_token.trim()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Logout successful".to_string(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    ),
    responses(
        (status = 200, description = "Authenticated user profile", body = MeResponse),
        (status = 401, description = "Missing, invalid, or expired access token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn me(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    match current_user(&auth_state, &headers).await {
        Ok(user) => (
            StatusCode::OK,
            Json(MeResponse {
                user: UserResponse::from(&user),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_bearer_token, parse_refresh_token};
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
    use uuid::Uuid;

    #[test]
    fn parse_refresh_token_accepts_id_dot_secret() {
        let id = Uuid::new_v4();
        let plaintext = format!("{}.some-secret", id.as_simple());
        let parsed = parse_refresh_token(&plaintext);
        assert_eq!(parsed, Some((id, "some-secret")));
    }

    #[test]
    fn parse_refresh_token_rejects_malformed_input() {
        assert_eq!(parse_refresh_token(""), None);
        assert_eq!(parse_refresh_token("no-dot-here"), None);
        assert_eq!(parse_refresh_token("not-a-uuid.secret"), None);
        let id = Uuid::new_v4();
        assert_eq!(parse_refresh_token(&format!("{}.", id.as_simple())), None);
    }

    #[test]
    fn bearer_token_extraction_handles_prefixes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_missing_header_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
