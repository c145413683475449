/// Backend process integration
///
/// The detection engine runs as a separate process that serves JSON over
/// HTTP and pushes updates over a WebSocket feed.
///
/// - `api`: HTTP client for the JSON endpoints and health probes
/// - `supervisor`: launches, health-checks and tears down the process
pub mod api;
pub mod supervisor;

pub use api::{BackendApi, Readiness};
pub use supervisor::{BackendConfig, BackendSupervisor};
