// AgisFL Core Library
// Client runtime for the AgisFL threat-monitoring dashboard

pub mod backend;
pub mod config;
pub mod feed;
pub mod preferences;
pub mod shell;
pub mod stream;
pub mod telemetry;

// Export core types
pub use backend::{BackendApi, BackendConfig, BackendSupervisor, Readiness};
pub use config::AgisConfig;
pub use feed::{DashboardSnapshot, FeedKind, FeedMessage, Severity};
pub use preferences::{JsonFileStore, MemoryStore, PreferenceStore, Preferences, Theme, ThemeStore};
pub use shell::{ShellChannel, ShellEvent, View};
pub use stream::{
    ConnectionState, StreamClient, StreamConfig, StreamHandle, StreamStatus, WsTransport,
};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgisError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Preferences error: {0}")]
    Preferences(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, AgisError>;

/// Client runtime: preferences, optional backend process and the live feed
pub struct AgisFl {
    pub config: AgisConfig,
    pub theme: ThemeStore,
    pub shell: ShellChannel,
    backend: Option<BackendSupervisor>,
    stream: Option<StreamHandle>,
}

impl AgisFl {
    pub fn new(config: AgisConfig) -> Self {
        let store = JsonFileStore::new(config.preferences_path.clone());
        let theme = ThemeStore::load(Box::new(store));
        Self {
            config,
            theme,
            shell: ShellChannel::default(),
            backend: None,
            stream: None,
        }
    }

    /// Replace the preference store (tests, or embedding with another persistence)
    pub fn with_theme(mut self, theme: ThemeStore) -> Self {
        self.theme = theme;
        self
    }

    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("Starting AgisFL...");

        if let Some(backend_cfg) = self.config.backend.clone() {
            let mut supervisor = BackendSupervisor::new(backend_cfg);
            supervisor.start()?;
            let api = BackendApi::new(&self.config.api_base, self.config.request_timeout())?;
            supervisor.wait_ready(&api).await?;
            self.backend = Some(supervisor);
        }

        let stream_config = self.config.stream_config()?;
        self.stream = Some(StreamClient::spawn(
            stream_config,
            std::sync::Arc::new(WsTransport::default()),
        ));

        tracing::info!("AgisFL started successfully");
        Ok(())
    }

    /// Live feed handle, available after `start`
    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    /// Restart the live feed with a fresh retry budget
    pub async fn reload(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.teardown().await;
        }
        self.stream = Some(StreamClient::spawn(
            self.config.stream_config()?,
            std::sync::Arc::new(WsTransport::default()),
        ));
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down AgisFL...");

        if let Some(stream) = self.stream.take() {
            stream.teardown().await;
        }
        if let Some(mut backend) = self.backend.take() {
            backend.stop().await?;
        }

        tracing::info!("AgisFL shut down successfully");
        Ok(())
    }
}
