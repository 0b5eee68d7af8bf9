//! Phone-OTP authentication and token-session handlers.
//!
//! Flow Overview:
//! 1) `send-otp` hashes a one-time code and stores a challenge for the phone.
//! 2) `verify-otp` consumes the challenge, resolves or creates the user, and
//!    returns an access/refresh token pair.
//! 3) `refresh` rotates the refresh token; the consumed value is revoked and
//!    chained to its replacement, so replay fails like an unknown token.
//! 4) `logout` revokes the presented token and always reports success.
//!
//! Secrets (OTP codes and refresh-token secrets) only ever reach storage as
//! argon2 digests. Access tokens are stateless HS256 JWTs; revocation acts on
//! refresh tokens alone.

mod error;
mod jwt;
#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod otp;
mod phone;
mod rate_limit;
pub(crate) mod session;
mod state;
mod storage;
mod store;
pub(crate) mod types;
mod utils;

pub use error::{AuthError, ErrorBody};
pub use rate_limit::{FixedWindowRateLimiter, NoopRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};
pub use storage::PgAuthStore;
pub use store::{
    DeviceInfo, NewOtpChallenge, NewRefreshToken, OtpChallenge, OtpStore, RefreshTokenRecord,
    RefreshTokenStore, Role, UserRecord, UserStore,
};
