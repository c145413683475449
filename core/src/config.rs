use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::backend::BackendConfig;
use crate::stream::config::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS,
};
use crate::stream::StreamConfig;
use crate::{AgisError, Result};

/// Client configuration: built-in defaults, then `AGISFL_*` environment
/// variables, then an optional TOML file
#[derive(Clone, Debug)]
pub struct AgisConfig {
    /// Base address of the backend's HTTP API
    pub api_base: String,
    /// Base address the stream URL is derived from
    pub stream_endpoint: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub preferences_path: PathBuf,
    /// Backend process to supervise; `None` when it is managed elsewhere
    pub backend: Option<BackendConfig>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl AgisConfig {
    /// Built-in defaults, ignoring the environment
    pub fn builtin() -> Self {
        Self {
            api_base: "http://127.0.0.1:8001".to_string(),
            stream_endpoint: "http://127.0.0.1:8001/api/ws".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: 10_000,
            preferences_path: PathBuf::from("agisfl-preferences.json"),
            backend: None,
        }
    }

    fn apply_env(mut self) -> Self {
        if let Some(v) = env_string("AGISFL_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = env_string("AGISFL_STREAM_ENDPOINT") {
            self.stream_endpoint = v;
        }
        if let Some(v) = env_parse("AGISFL_STREAM_MAX_ATTEMPTS") {
            self.max_attempts = v;
        }
        if let Some(v) = env_parse("AGISFL_STREAM_BASE_DELAY_MS") {
            self.base_delay_ms = v;
        }
        if let Some(v) = env_parse("AGISFL_STREAM_MAX_DELAY_MS") {
            self.max_delay_ms = v;
        }
        if let Some(v) = env_parse("AGISFL_STREAM_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = v;
        }
        if let Some(v) = env_parse("AGISFL_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = v;
        }
        if let Some(v) = env_string("AGISFL_PREFERENCES") {
            self.preferences_path = PathBuf::from(v);
        }
        if let Some(cmd) = env_string("AGISFL_BACKEND_CMD") {
            let args = env_string("AGISFL_BACKEND_ARGS")
                .map(|a| a.split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default();
            self.backend = Some(BackendConfig::new(cmd).with_args(args));
        }
        self
    }

    /// Load configuration (path via AGISFL_CONFIG or ./agisfl.toml). A
    /// missing file is not an error; an unreadable or invalid one is logged
    /// and ignored.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("AGISFL_CONFIG").unwrap_or_else(|_| "agisfl.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "agisfl_config", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::overlay_toml(default.clone(), &s) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(target: "agisfl_config", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "agisfl_config", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Overlay a TOML document onto `base`
    pub fn overlay_toml(base: Self, toml_str: &str) -> Result<Self> {
        let t: AgisToml =
            toml::from_str(toml_str).map_err(|e| AgisError::Config(e.to_string()))?;
        Ok(t.overlay(base))
    }

    pub fn stream_config(&self) -> Result<StreamConfig> {
        StreamConfig::builder(self.stream_endpoint.clone())
            .max_attempts(self.max_attempts)
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .build()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AgisConfig {
    fn default() -> Self {
        Self::builtin().apply_env()
    }
}

#[derive(Debug, Default, Deserialize)]
struct AgisToml {
    api_base: Option<String>,
    preferences_path: Option<PathBuf>,
    request_timeout_ms: Option<u64>,
    stream: Option<StreamToml>,
    backend: Option<BackendConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamToml {
    endpoint: Option<String>,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

impl AgisToml {
    fn overlay(self, mut base: AgisConfig) -> AgisConfig {
        if let Some(v) = self.api_base {
            base.api_base = v;
        }
        if let Some(v) = self.preferences_path {
            base.preferences_path = v;
        }
        if let Some(v) = self.request_timeout_ms {
            base.request_timeout_ms = v;
        }
        if let Some(s) = self.stream {
            if let Some(v) = s.endpoint {
                base.stream_endpoint = v;
            }
            if let Some(v) = s.max_attempts {
                base.max_attempts = v;
            }
            if let Some(v) = s.base_delay_ms {
                base.base_delay_ms = v;
            }
            if let Some(v) = s.max_delay_ms {
                base.max_delay_ms = v;
            }
            if let Some(v) = s.connect_timeout_ms {
                base.connect_timeout_ms = v;
            }
        }
        if let Some(b) = self.backend {
            base.backend = Some(b);
        }
        base
    }
}
