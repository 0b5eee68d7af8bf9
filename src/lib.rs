//! # Bazari (Vendor Marketplace API)
//!
//! `bazari` is the REST backend for a vendor/service marketplace. This crate
//! carries the authentication and session authority: phone-based OTP login,
//! access/refresh token issuance, rotation, and revocation.
//!
//! ## Authentication (phone OTP)
//!
//! Possession of a phone number is proven with a one-time numeric code. Codes
//! are generated from the OS CSPRNG, stored only as argon2 digests, and are
//! consumed by a bounded number of verification attempts or by expiry.
//!
//! - **Users:** created on first successful verification with the default
//!   `vendor` role; a phone number maps to at most one user.
//! - **Access tokens:** short-lived HS256 JWTs carrying `{sub, phone, role}`.
//!   They are stateless; revocation operates on refresh tokens only.
//! - **Refresh tokens:** opaque secrets returned to the client exactly once.
//!   The database keeps an argon2 digest plus device metadata. Every refresh
//!   rotates the token; the replaced record is revoked and chained to its
//!   successor, so a replayed value fails like an unknown one.
//!
//! ## Storage
//!
//! State lives in `PostgreSQL` behind explicit store handles (no ambient
//! connection globals). Expired OTP challenges and refresh tokens are removed
//! by a background sweep.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
