//! Runtime configuration, read from `QUOTESYNC_*` environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `QUOTESYNC_BASE_URL` | `http://localhost:8080/api` | Remote API root |
//! | `QUOTESYNC_API_KEY` | unset | Sent as the `apikey` query parameter |
//! | `QUOTESYNC_TIMEOUT_MS` | `3000` | Per-request transport timeout |
//! | `QUOTESYNC_POLL_INTERVAL_SECS` | `15` | Quote refresh period |
//! | `QUOTESYNC_REQUESTS_PER_SECOND` | `10` | Request budget, `0` disables |

use std::env;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::retry::RetryConfig;
use crate::ValidationError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
/// Maximum symbols per profile request accepted by the provider.
pub const PROFILE_BATCH_LIMIT: usize = 3;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    /// `None` disables client-side throttling.
    pub requests_per_second: Option<NonZeroU32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key: None,
            timeout_ms: 3_000,
            requests_per_second: NonZeroU32::new(10),
        }
    }
}

/// Sync engine settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api: ApiConfig,
    pub profile_batch_limit: usize,
    pub poll_interval: Duration,
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            profile_batch_limit: PROFILE_BATCH_LIMIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(base_url) = read("QUOTESYNC_BASE_URL") {
            config.api.base_url = validate_base_url(&base_url)?;
        }
        config.api.api_key = read("QUOTESYNC_API_KEY");
        if let Some(value) = read("QUOTESYNC_TIMEOUT_MS") {
            config.api.timeout_ms = parse_positive("QUOTESYNC_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read("QUOTESYNC_POLL_INTERVAL_SECS") {
            let seconds = parse_positive("QUOTESYNC_POLL_INTERVAL_SECS", &value)?;
            config.poll_interval = Duration::from_secs(seconds);
        }
        if let Some(value) = read("QUOTESYNC_REQUESTS_PER_SECOND") {
            let rate = value
                .trim()
                .parse::<u32>()
                .map_err(|_| ValidationError::InvalidConfig {
                    key: "QUOTESYNC_REQUESTS_PER_SECOND",
                    value: value.clone(),
                    reason: "expected a non-negative integer",
                })?;
            config.api.requests_per_second = NonZeroU32::new(rate);
        }

        Ok(config)
    }
}

/// Trim a trailing slash and insist on an http(s) scheme.
pub fn validate_base_url(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ValidationError::InvalidConfig {
            key: "QUOTESYNC_BASE_URL",
            value: value.to_owned(),
            reason: "expected an http:// or https:// URL",
        });
    }
    Ok(trimmed.to_owned())
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ValidationError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ValidationError::InvalidConfig {
            key,
            value: value.to_owned(),
            reason: "expected a positive integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_provider_limits() {
        let config = SyncConfig::from_lookup(lookup(&[])).expect("config");

        assert_eq!(config.profile_batch_limit, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.api_key, None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("QUOTESYNC_BASE_URL", "https://quotes.example.test/v3/"),
            ("QUOTESYNC_API_KEY", "secret"),
            ("QUOTESYNC_TIMEOUT_MS", "750"),
            ("QUOTESYNC_POLL_INTERVAL_SECS", "30"),
            ("QUOTESYNC_REQUESTS_PER_SECOND", "0"),
        ]))
        .expect("config");

        assert_eq!(config.api.base_url, "https://quotes.example.test/v3");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_ms, 750);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.api.requests_per_second, None);
    }

    #[test]
    fn rejects_malformed_values() {
        let err = SyncConfig::from_lookup(lookup(&[("QUOTESYNC_BASE_URL", "ftp://nope")]))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidConfig { key: "QUOTESYNC_BASE_URL", .. }));

        let err = SyncConfig::from_lookup(lookup(&[("QUOTESYNC_POLL_INTERVAL_SECS", "0")]))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));
    }
}
