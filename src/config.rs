use std::time::Duration;

/// Polling interval bounds, in seconds.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 5;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
/// Answers with the session cookie Yahoo expects before handing out a crumb.
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub update_interval: Duration,
    pub cache_ttl: Duration,
    pub max_concurrent_fetches: usize,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
    pub base_url: String,
    pub cookie_url: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            update_interval: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(30),
            max_concurrent_fetches: 4,
            request_timeout: Duration::from_secs(10),
            min_request_interval: Duration::from_millis(200),
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Sets the polling interval, clamped to 5..=60 seconds.
    pub fn with_update_interval_secs(mut self, secs: u64) -> Self {
        let clamped = secs.clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS);
        self.update_interval = Duration::from_secs(clamped);
        self
    }

    /// A zero TTL disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_cookie_url(mut self, url: &str) -> Self {
        self.cookie_url = url.to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_interval_is_clamped() {
        assert_eq!(Config::new().with_update_interval_secs(1).update_interval, Duration::from_secs(5));
        assert_eq!(Config::new().with_update_interval_secs(600).update_interval, Duration::from_secs(60));
        assert_eq!(Config::new().with_update_interval_secs(15).update_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_concurrency_never_zero() {
        assert_eq!(Config::new().with_max_concurrent_fetches(0).max_concurrent_fetches, 1);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = Config::new().with_base_url("http://localhost:8080/");
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_request_settings() {
        let config = Config::new()
            .with_user_agent("dashboard/1.0")
            .with_min_request_interval(Duration::ZERO)
            .with_cookie_url("http://localhost:8080/cookie");
        assert_eq!(config.user_agent, "dashboard/1.0");
        assert!(config.min_request_interval.is_zero());
        assert_eq!(config.cookie_url, "http://localhost:8080/cookie");
        assert_eq!(Config::default().cookie_url, DEFAULT_COOKIE_URL);
    }
}
