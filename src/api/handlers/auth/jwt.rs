//! Access-token codec: short-lived HS256 bearer credentials.
//!
//! Tokens are stateless; possession alone, verified against the signing
//! secret, authorizes a request. Revocation lives entirely on the refresh
//! token side, so a leaked access token stays valid until its own expiry.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::store::UserRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    /// User id.
    pub sub: String,
    pub phone: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessTokenClaims {
    pub(crate) fn new(user: &UserRecord, ttl_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            phone: user.phone.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + ttl_seconds,
        }
    }

    pub(crate) fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Verification failures the boundary layer must tell apart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Signature is valid but the token is past its TTL.
    #[error("token expired")]
    Expired,
    /// Bad signature or malformed token.
    #[error("invalid token")]
    Invalid,
}

/// Sign a claim set with the symmetric secret.
///
/// # Errors
///
/// Returns an error if claims serialization or signing fails.
pub(crate) fn sign(claims: &AccessTokenClaims, secret: &SecretString) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .context("failed to sign access token")
}

/// Verify a token and return its claims.
///
/// # Errors
///
/// Returns [`TokenError::Expired`] for a well-signed token past its TTL and
/// [`TokenError::Invalid`] for everything else.
pub(crate) fn verify(token: &str, secret: &SecretString) -> Result<AccessTokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}
