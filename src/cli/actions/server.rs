use crate::api::{self, expiry::ExpiryWorkerConfig, handlers::auth::AuthConfig};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub cors_origin: String,
    pub jwt_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_days: i64,
    pub otp_ttl_minutes: i64,
    pub otp_max_attempts: i32,
    pub otp_length: usize,
    pub otp_dummy_mode: bool,
    pub otp_dummy_code: String,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub expiry_sweep_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.jwt_secret, args.cors_origin)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_token_ttl_days(args.refresh_token_ttl_days)
        .with_otp_ttl_minutes(args.otp_ttl_minutes)
        .with_otp_max_attempts(args.otp_max_attempts)
        .with_otp_length(args.otp_length)
        .with_otp_dummy_mode(args.otp_dummy_mode)
        .with_otp_dummy_code(args.otp_dummy_code)
        .with_rate_limit_window_seconds(args.rate_limit_window_seconds)
        .with_rate_limit_max_requests(args.rate_limit_max_requests);

    let expiry_config =
        ExpiryWorkerConfig::new().with_poll_interval_seconds(args.expiry_sweep_seconds);

    api::new(args.port, args.dsn, auth_config, expiry_config).await
}
