/// Live feed from the backend
///
/// Keeps one best-effort connection to the backend's push stream, decodes
/// inbound JSON and re-establishes the connection with capped exponential
/// backoff when it drops.
///
/// Architecture:
/// - `config`: endpoint derivation and retry parameters
/// - `backoff`: bounded retry budget
/// - `state`: connection state and observable status
/// - `payload`: latest decoded payload
/// - `transport`: connection seam (WebSocket in production)
/// - `client`: the reconnect driver and its handle
pub mod backoff;
pub mod client;
pub mod config;
pub mod payload;
pub mod state;
pub mod transport;

pub use backoff::RetryBudget;
pub use client::{StreamClient, StreamHandle};
pub use config::{derive_stream_url, StreamConfig, StreamConfigBuilder};
pub use payload::LatestPayload;
pub use state::{ConnectionState, StreamStatus};
pub use transport::{Frame, StreamConnection, StreamTransport, WsTransport};
