use http::header::RETRY_AFTER;
use http::HeaderMap;
use tokio::time::Duration;

use crate::config::settings::RetryConfig;
use crate::utils::constants::{
    RETRY_AFTER_MAX_SECONDS_DEFAULT, RETRY_ATTEMPTS_DEFAULT, RETRY_BASE_DELAY_MS_DEFAULT,
    RETRY_MAX_DELAY_MS_DEFAULT,
};

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_retry_after_seconds: u64,
}

impl From<&RetryConfig> for RetrySettings {
    fn from(retry: &RetryConfig) -> Self {
        Self {
            attempts: retry.attempts.unwrap_or(RETRY_ATTEMPTS_DEFAULT),
            base_delay_ms: retry.base_delay_ms.unwrap_or(RETRY_BASE_DELAY_MS_DEFAULT),
            max_delay_ms: retry.max_delay_ms.unwrap_or(RETRY_MAX_DELAY_MS_DEFAULT),
            max_retry_after_seconds: retry
                .max_retry_after_seconds
                .unwrap_or(RETRY_AFTER_MAX_SECONDS_DEFAULT),
        }
    }
}

impl RetrySettings {
    /// `base * 2^attempt + jitter(attempt)`, capped at `max_delay_ms`.
    /// `attempt` is the 0-based index of the attempt that just failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let delay = exponential.saturating_add(self.jitter_ms(attempt));
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    // a tenth of the base delay per attempt
    fn jitter_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms.saturating_mul(attempt as u64) / 10
    }

    /// Wait before retrying a rate-limited request: upstream's `Retry-After`
    /// when it is a number of seconds, exponential backoff otherwise.
    /// `None` when upstream asks for longer than `max_retry_after_seconds`.
    pub fn rate_limit_wait(&self, headers: &HeaderMap, attempt: u32) -> Option<Duration> {
        match retry_after(headers) {
            Some(wait) if wait > Duration::from_secs(self.max_retry_after_seconds) => None,
            Some(wait) => Some(wait),
            None => Some(self.backoff(attempt)),
        }
    }
}

pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Per-dispatch retry bookkeeping.
#[derive(Debug, Default)]
pub struct RetryState {
    /// transient failures observed so far
    pub attempt: u32,
    /// the one allowed refresh-and-retry after a 401 is spent
    pub token_refreshed: bool,
    pub last_failure: Option<String>,
}

impl RetryState {
    pub fn record_transient(&mut self, failure: String) -> u32 {
        let failed = self.attempt;
        self.attempt += 1;
        self.last_failure = Some(failure);
        failed
    }
}
