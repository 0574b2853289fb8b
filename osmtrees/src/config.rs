//! Overpass client configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Public Overpass API interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the whole request, including reading the response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// User agent sent with every Overpass request.
pub const DEFAULT_USER_AGENT: &str = concat!("osmtrees/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`OverpassClient`](crate::OverpassClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Overpass interpreter URL.
    pub endpoint: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Timeout for a single request attempt.
    pub request_timeout: Duration,
    /// User agent header value.
    pub user_agent: String,
    /// Retry policy for gateway timeouts.
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a custom Overpass endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `OSMTREES_OVERPASS_URL` | Overpass interpreter URL | public endpoint |
    /// | `OSMTREES_MAX_RETRIES` | Retries on gateway timeout | 2 |
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("OSMTREES_OVERPASS_URL").filter(|u| !u.trim().is_empty()) {
            config.endpoint = url.trim().to_string();
        }

        if let Some(raw) = lookup("OSMTREES_MAX_RETRIES") {
            match raw.trim().parse::<u32>() {
                Ok(n) => config.retry.max_retries = n,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "Invalid OSMTREES_MAX_RETRIES, keeping default"
                ),
            }
        }

        config
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-attempt request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}
