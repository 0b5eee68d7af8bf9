//! Background expiry sweep for OTP challenges and refresh tokens.
//!
//! The datastore keeps no TTL machinery of its own; queries already ignore
//! expired rows, and this worker periodically deletes them so the tables stay
//! bounded. A challenge or token that is expired but not yet swept behaves
//! exactly like a missing one.

use crate::api::handlers::auth::AuthState;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug)]
pub struct ExpiryWorkerConfig {
    poll_interval: Duration,
}

impl ExpiryWorkerConfig {
    /// Default worker config: one sweep per minute.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.poll_interval
        };
        Self { poll_interval }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for ExpiryWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a background task that periodically purges expired auth records.
pub fn spawn_expiry_worker(
    state: Arc<AuthState>,
    config: ExpiryWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let poll_interval = config.poll_interval();

        loop {
            if let Err(err) = sweep_once(&state).await {
                error!("expiry sweep failed: {err}");
            }

            sleep(poll_interval).await;
        }
    })
}

async fn sweep_once(state: &AuthState) -> Result<u64> {
    let challenges = state.otp_store().purge_expired().await?;
    let tokens = state.refresh_store().purge_expired().await?;
    let purged = challenges + tokens;
    if purged > 0 {
        debug!(
            challenges_purged = challenges,
            tokens_purged = tokens,
            "expired auth records purged"
        );
    }
    Ok(purged)
}
