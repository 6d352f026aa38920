//! Runtime settings: defaults, then VLLMTOP_* env vars, then CLI flags.

use std::time::Duration;

pub const DEFAULT_POLL_MS: u64 = 5_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MIN_POLL_MS: u64 = 250;

pub const POLL_ENV: &str = "VLLMTOP_POLL_MS";
pub const TIMEOUT_ENV: &str = "VLLMTOP_TIMEOUT_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

fn parse_ms(v: Option<&str>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok()).filter(|&ms| ms > 0)
}

impl Settings {
    pub fn from_env() -> Self {
        Self::default().with_overrides(
            std::env::var(POLL_ENV).ok().as_deref(),
            std::env::var(TIMEOUT_ENV).ok().as_deref(),
        )
    }

    /// Unparseable or zero values keep the current setting.
    pub fn with_overrides(mut self, poll_ms: Option<&str>, timeout_ms: Option<&str>) -> Self {
        if let Some(ms) = parse_ms(poll_ms) {
            self.poll_interval = Duration::from_millis(ms.max(MIN_POLL_MS));
        }
        if let Some(ms) = parse_ms(timeout_ms) {
            self.request_timeout = Duration::from_millis(ms);
        }
        self
    }
}
