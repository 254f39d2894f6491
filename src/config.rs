use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The default base URL of the DeckMaster REST API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

/// Retry and timeout policy for backend calls.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles for every later attempt.
    pub base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl GatewayConfig {
    /// Backoff to wait after the given failed attempt (1-based).
    ///
    /// Attempt 1 waits `base_delay`, attempt 2 waits twice that, and so on.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Polling policy for generation jobs.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait between two status checks of a pending job.
    pub interval: Duration,
    /// Wait after a failed status check.
    pub retry_delay: Duration,
    /// Lower bound on the number of status checks.
    pub min_attempts: u32,
    /// Consecutive failed status checks that end the loop.
    pub max_consecutive_failures: u32,
    /// Estimate assumed when the server does not send one.
    pub default_estimate: Duration,
    /// Longest server estimate honored; larger ones are clamped.
    pub max_estimate: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            retry_delay: Duration::from_secs(3),
            min_attempts: 30,
            max_consecutive_failures: 3,
            default_estimate: Duration::from_secs(30),
            max_estimate: Duration::from_secs(30 * 60),
        }
    }
}

/// The client's configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the REST API, e.g. `http://127.0.0.1:5000/api`.
    pub api_base_url: String,
    /// The URL of the Redis server backing the local store, if any.
    pub redis_url: Option<String>,
    /// Prefix for every key written to Redis.
    pub redis_key_prefix: String,
    /// The admin credential the local gate compares against.
    pub admin_secret: Option<Zeroizing<String>>,
    /// Backend retry and timeout policy.
    pub gateway: GatewayConfig,
    /// Job polling policy.
    pub poll: PollConfig,
    /// Freshness window of the plan catalog cache.
    pub plan_cache_ttl: Duration,
    /// Duration of an admin session activated without backend confirmation.
    pub admin_fallback: Duration,
}

impl Config {
    /// Creates a `Config` with default policies for the given API base URL.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            redis_url: None,
            redis_key_prefix: "deckmaster".to_string(),
            admin_secret: None,
            gateway: GatewayConfig::default(),
            poll: PollConfig::default(),
            plan_cache_ttl: Duration::from_secs(3600),
            admin_fallback: Duration::from_secs(3600),
        }
    }

    /// Sets the admin credential.
    pub fn with_admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_secret = Some(Zeroizing::new(secret.into()));
        self
    }

    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::new(DEFAULT_API_URL);

        let api_base_url = env::var("DECKMASTER_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            anyhow::bail!("DECKMASTER_API_URL must be an http(s) URL, got {}", api_base_url);
        }

        let admin_secret = env::var("DECKMASTER_ADMIN_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Zeroizing::new);

        let gateway = GatewayConfig {
            request_timeout: Duration::from_secs(
                parse_var("REQUEST_TIMEOUT_SECS", 30)
                    .context("Invalid REQUEST_TIMEOUT_SECS")?,
            ),
            max_attempts: parse_var("MAX_ATTEMPTS", 3).context("Invalid MAX_ATTEMPTS")?,
            base_delay: Duration::from_millis(
                parse_var("RETRY_BASE_DELAY_MS", 1000).context("Invalid RETRY_BASE_DELAY_MS")?,
            ),
        };

        if gateway.max_attempts == 0 {
            anyhow::bail!("MAX_ATTEMPTS must be at least 1");
        }

        let poll = PollConfig {
            interval: Duration::from_millis(
                parse_var("POLL_INTERVAL_MS", 2000).context("Invalid POLL_INTERVAL_MS")?,
            ),
            retry_delay: Duration::from_millis(
                parse_var("POLL_RETRY_DELAY_MS", 3000).context("Invalid POLL_RETRY_DELAY_MS")?,
            ),
            ..PollConfig::default()
        };

        Ok(Self {
            api_base_url,
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            redis_key_prefix: env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| defaults.redis_key_prefix.clone()),
            admin_secret,
            gateway,
            poll,
            plan_cache_ttl: Duration::from_secs(
                parse_var("PLAN_CACHE_TTL_SECS", 3600).context("Invalid PLAN_CACHE_TTL_SECS")?,
            ),
            admin_fallback: Duration::from_secs(
                parse_var("ADMIN_FALLBACK_SECS", 3600).context("Invalid ADMIN_FALLBACK_SECS")?,
            ),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => Ok(raw.trim().parse()?),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base_delay() {
        let config = GatewayConfig::default();
        assert_eq!(config.delay_after_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_after_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_after_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn defaults_follow_service_policy() {
        let config = Config::new(DEFAULT_API_URL);
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(30));
        assert_eq!(config.gateway.max_attempts, 3);
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.plan_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.admin_fallback, Duration::from_secs(3600));
        assert!(config.admin_secret.is_none());
    }
}
