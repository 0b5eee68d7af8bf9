//! Rate limiting primitives for auth flows.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Debug)]
struct WindowState {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter keyed by caller-supplied strings (normalized phone
/// numbers for send-otp). Windows for other keys are pruned on every check so
/// the map stays bounded by the active caller set.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    window: Duration,
    max_requests: u32,
    hits: Mutex<HashMap<String, WindowState>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            hits: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        hits.retain(|_, state| state.started_at.elapsed() < self.window);

        match hits.get_mut(key) {
            None => {
                hits.insert(
                    key.to_string(),
                    WindowState {
                        started_at: Instant::now(),
                        count: 1,
                    },
                );
                RateLimitDecision::Allowed
            }
            Some(state) if state.count < self.max_requests => {
                state.count += 1;
                RateLimitDecision::Allowed
            }
            Some(_) => RateLimitDecision::Limited,
        }
    }
}
