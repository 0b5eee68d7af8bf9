use clap::{Arg, ArgAction, Command};

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_otp_args(command);
    with_rate_limit_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("Symmetric secret used to sign access tokens")
                .env("BAZARI_JWT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("BAZARI_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-token-ttl-days")
                .long("refresh-token-ttl-days")
                .help("Refresh token TTL in days")
                .env("BAZARI_REFRESH_TOKEN_TTL_DAYS")
                .default_value("30")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_otp_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("otp-ttl-minutes")
                .long("otp-ttl-minutes")
                .help("OTP challenge TTL in minutes")
                .env("BAZARI_OTP_TTL_MINUTES")
                .default_value("10")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("otp-max-attempts")
                .long("otp-max-attempts")
                .help("Max wrong codes before a challenge is discarded")
                .env("BAZARI_OTP_MAX_ATTEMPTS")
                .default_value("3")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("otp-length")
                .long("otp-length")
                .help("Number of digits in generated OTP codes")
                .env("BAZARI_OTP_LENGTH")
                .default_value("6")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("otp-dummy-mode")
                .long("otp-dummy-mode")
                .help("Bypass code generation with the fixed dummy code (never enable in production)")
                .env("BAZARI_OTP_DUMMY_MODE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("otp-dummy-code")
                .long("otp-dummy-code")
                .help("Fixed code returned while dummy mode is active")
                .env("BAZARI_OTP_DUMMY_CODE")
                .default_value("123456"),
        )
        .arg(
            Arg::new("expiry-sweep-seconds")
                .long("expiry-sweep-seconds")
                .help("Interval between sweeps of expired OTP and refresh token rows")
                .env("BAZARI_EXPIRY_SWEEP_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_rate_limit_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("rate-limit-window-seconds")
                .long("rate-limit-window-seconds")
                .help("Fixed window size for the send-otp rate limit")
                .env("BAZARI_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("rate-limit-max-requests")
                .long("rate-limit-max-requests")
                .help("Max send-otp requests per phone within the window")
                .env("BAZARI_RATE_LIMIT_MAX_REQUESTS")
                .default_value("3")
                .value_parser(clap::value_parser!(u32)),
        )
}
