//! Auth configuration and shared state.

use secrecy::SecretString;
use std::sync::Arc;

use super::rate_limit::RateLimiter;
use super::store::{OtpStore, RefreshTokenStore, UserStore};

const DEFAULT_OTP_TTL_MINUTES: i64 = 10;
const DEFAULT_OTP_MAX_ATTEMPTS: i32 = 3;
const DEFAULT_OTP_LENGTH: usize = 6;
const DEFAULT_OTP_DUMMY_CODE: &str = "123456";
const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 10 * 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 3;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_secret: SecretString,
    cors_origin: String,
    otp_ttl_minutes: i64,
    otp_max_attempts: i32,
    otp_length: usize,
    otp_dummy_mode: bool,
    otp_dummy_code: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
    rate_limit_window_seconds: u64,
    rate_limit_max_requests: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString, cors_origin: String) -> Self {
        Self {
            signing_secret,
            cors_origin,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            otp_max_attempts: DEFAULT_OTP_MAX_ATTEMPTS,
            otp_length: DEFAULT_OTP_LENGTH,
            otp_dummy_mode: false,
            otp_dummy_code: DEFAULT_OTP_DUMMY_CODE.to_string(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_days: DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_minutes(mut self, minutes: i64) -> Self {
        self.otp_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_otp_max_attempts(mut self, attempts: i32) -> Self {
        self.otp_max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_otp_length(mut self, length: usize) -> Self {
        self.otp_length = length;
        self
    }

    #[must_use]
    pub fn with_otp_dummy_mode(mut self, enabled: bool) -> Self {
        self.otp_dummy_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_otp_dummy_code(mut self, code: String) -> Self {
        self.otp_dummy_code = code;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_days(mut self, days: i64) -> Self {
        self.refresh_token_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: u64) -> Self {
        self.rate_limit_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_max_requests(mut self, requests: u32) -> Self {
        self.rate_limit_max_requests = requests;
        self
    }

    #[must_use]
    pub fn cors_origin(&self) -> &str {
        &self.cors_origin
    }

    #[must_use]
    pub fn otp_ttl_minutes(&self) -> i64 {
        self.otp_ttl_minutes
    }

    #[must_use]
    pub fn otp_max_attempts(&self) -> i32 {
        self.otp_max_attempts
    }

    #[must_use]
    pub fn otp_length(&self) -> usize {
        self.otp_length
    }

    #[must_use]
    pub fn otp_dummy_mode(&self) -> bool {
        self.otp_dummy_mode
    }

    #[must_use]
    pub fn otp_dummy_code(&self) -> &str {
        &self.otp_dummy_code
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_days(&self) -> i64 {
        self.refresh_token_ttl_days
    }

    #[must_use]
    pub fn rate_limit_window_seconds(&self) -> u64 {
        self.rate_limit_window_seconds
    }

    #[must_use]
    pub fn rate_limit_max_requests(&self) -> u32 {
        self.rate_limit_max_requests
    }

    pub(crate) fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }
}

/// Shared state for the auth handlers: configuration plus explicit store
/// handles. Stores are seams, not globals; the process entry point decides
/// what backs them.
pub struct AuthState {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    otp: Arc<dyn OtpStore>,
    refresh: Arc<dyn RefreshTokenStore>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        otp: Arc<dyn OtpStore>,
        refresh: Arc<dyn RefreshTokenStore>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            users,
            otp,
            refresh,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub(crate) fn otp_store(&self) -> &dyn OtpStore {
        self.otp.as_ref()
    }

    pub(crate) fn refresh_store(&self) -> &dyn RefreshTokenStore {
        self.refresh.as_ref()
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::memory::MemoryAuthStore;
    use crate::api::handlers::auth::rate_limit::NoopRateLimiter;

    fn secret() -> SecretString {
        SecretString::from("test-secret".to_string())
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new(secret(), "http://localhost:3000".to_string());

        assert_eq!(config.cors_origin(), "http://localhost:3000");
        assert_eq!(config.otp_ttl_minutes(), DEFAULT_OTP_TTL_MINUTES);
        assert_eq!(config.otp_max_attempts(), DEFAULT_OTP_MAX_ATTEMPTS);
        assert_eq!(config.otp_length(), DEFAULT_OTP_LENGTH);
        assert!(!config.otp_dummy_mode());
        assert_eq!(config.otp_dummy_code(), DEFAULT_OTP_DUMMY_CODE);
        assert_eq!(
            config.access_token_ttl_seconds(),
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS
        );
        assert_eq!(
            config.refresh_token_ttl_days(),
            DEFAULT_REFRESH_TOKEN_TTL_DAYS
        );
        assert_eq!(
            config.rate_limit_window_seconds(),
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS
        );
        assert_eq!(
            config.rate_limit_max_requests(),
            DEFAULT_RATE_LIMIT_MAX_REQUESTS
        );

        let config = config
            .with_otp_ttl_minutes(5)
            .with_otp_max_attempts(1)
            .with_otp_length(8)
            .with_otp_dummy_mode(true)
            .with_otp_dummy_code("000000".to_string())
            .with_access_token_ttl_seconds(60)
            .with_refresh_token_ttl_days(7)
            .with_rate_limit_window_seconds(30)
            .with_rate_limit_max_requests(1);

        assert_eq!(config.otp_ttl_minutes(), 5);
        assert_eq!(config.otp_max_attempts(), 1);
        assert_eq!(config.otp_length(), 8);
        assert!(config.otp_dummy_mode());
        assert_eq!(config.otp_dummy_code(), "000000");
        assert_eq!(config.access_token_ttl_seconds(), 60);
        assert_eq!(config.refresh_token_ttl_days(), 7);
        assert_eq!(config.rate_limit_window_seconds(), 30);
        assert_eq!(config.rate_limit_max_requests(), 1);
    }

    #[test]
    fn debug_output_redacts_the_signing_secret() {
        let config = AuthConfig::new(secret(), "http://localhost:3000".to_string());
        let debugged = format!("{config:?}");
        assert!(!debugged.contains("test-secret"));
    }

    #[test]
    fn auth_state_exposes_config() {
        let store = Arc::new(MemoryAuthStore::new());
        let config = AuthConfig::new(secret(), "http://localhost:3000".to_string());
        let state = AuthState::new(
            config,
            store.clone(),
            store.clone(),
            store,
            Arc::new(NoopRateLimiter),
        );
        assert_eq!(state.config().cors_origin(), "http://localhost:3000");
    }
}
