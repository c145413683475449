// Stream client configuration
//
// One parameterised client covers every feed: endpoint, retry ceiling and
// backoff bounds are all configuration.

use crate::{AgisError, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Derive the push-stream address from a base HTTP(S) address.
///
/// `http` becomes `ws`, `https` becomes `wss`, and a leading `/api` path
/// segment is dropped: `http://host/api/feed` -> `ws://host/feed`.
/// Addresses that are already `ws`/`wss` keep their scheme.
pub fn derive_stream_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| AgisError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(AgisError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in {}",
                other, endpoint
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AgisError::InvalidEndpoint(format!("cannot use scheme {}", scheme)))?;

    let path = url.path().to_string();
    if path == "/api" {
        url.set_path("/");
    } else if let Some(rest) = path.strip_prefix("/api/") {
        url.set_path(&format!("/{}", rest));
    }

    Ok(url)
}

/// Stream client configuration
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Derived `ws://` / `wss://` address
    pub url: Url,
    /// Retries scheduled before giving up; reset on every successful connect
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub connect_timeout: Duration,
}

impl StreamConfig {
    pub fn builder(endpoint: impl Into<String>) -> StreamConfigBuilder {
        StreamConfigBuilder {
            endpoint: endpoint.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Config with default retry parameters
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::builder(endpoint).build()
    }
}

#[derive(Clone, Debug)]
pub struct StreamConfigBuilder {
    endpoint: String,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    connect_timeout: Duration,
}

impl StreamConfigBuilder {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<StreamConfig> {
        if self.max_delay < self.base_delay {
            return Err(AgisError::Config(format!(
                "max delay {:?} is below base delay {:?}",
                self.max_delay, self.base_delay
            )));
        }
        Ok(StreamConfig {
            url: derive_stream_url(&self.endpoint)?,
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            connect_timeout: self.connect_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_api_path_becomes_ws() {
        let url = derive_stream_url("http://host/api/feed").unwrap();
        assert_eq!(url.as_str(), "ws://host/feed");
    }

    #[test]
    fn test_https_becomes_wss_and_keeps_port() {
        let url = derive_stream_url("https://localhost:8001/api/ws").unwrap();
        assert_eq!(url.as_str(), "wss://localhost:8001/ws");
    }

    #[test]
    fn test_bare_api_prefix_is_dropped() {
        let url = derive_stream_url("http://host/api").unwrap();
        assert_eq!(url.as_str(), "ws://host/");
    }

    #[test]
    fn test_lookalike_prefix_is_kept() {
        let url = derive_stream_url("http://host/apis/feed").unwrap();
        assert_eq!(url.as_str(), "ws://host/apis/feed");
    }

    #[test]
    fn test_ws_address_passes_through() {
        let url = derive_stream_url("wss://host/ws?token=abc").unwrap();
        assert_eq!(url.as_str(), "wss://host/ws?token=abc");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            derive_stream_url("ftp://host/api/feed"),
            Err(AgisError::InvalidEndpoint(_))
        ));
        assert!(derive_stream_url("not a url").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let cfg = StreamConfig::new("http://127.0.0.1:8001/api/ws").unwrap();
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.base_delay, Duration::from_secs(1));
        assert_eq!(cfg.max_delay, Duration::from_secs(30));
        assert_eq!(cfg.url.as_str(), "ws://127.0.0.1:8001/ws");
    }

    #[test]
    fn test_builder_rejects_inverted_delays() {
        let res = StreamConfig::builder("http://host/api/feed")
            .base_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(1))
            .build();
        assert!(matches!(res, Err(AgisError::Config(_))));
    }
}
