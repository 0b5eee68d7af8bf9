//! Code/token generation and credential hashing for auth flows.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore, rngs::OsRng};

/// Generate a numeric one-time code from the OS CSPRNG.
///
/// Codes gate account access, so a statistical PRNG is not acceptable here.
pub(crate) fn generate_numeric_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Create a new opaque secret. The raw value is only ever returned to the
/// client; the database stores an argon2 digest.
pub(crate) fn generate_opaque_secret() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate opaque secret")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// A fresh refresh-token secret plus its expiry horizon.
pub(crate) struct RefreshTokenBundle {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

pub(crate) fn generate_refresh_bundle(ttl_days: i64) -> Result<RefreshTokenBundle> {
    Ok(RefreshTokenBundle {
        secret: generate_opaque_secret()?,
        expires_at: Utc::now() + chrono::Duration::days(ttl_days),
    })
}

/// Hash a secret (OTP code or refresh secret) with a fresh salt.
///
/// argon2 default parameters keep a single hash well under a second while
/// making bulk brute force impractical.
pub(crate) fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash secret: {err}"))
}

/// Verify a secret against a stored digest. The comparison inside the verify
/// primitive is constant-time; malformed digests verify as `false`.
pub(crate) fn verify_secret(secret: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract a client IP for device metadata from common proxy headers.
pub(crate) fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
