// Logging setup
use tracing_subscriber::EnvFilter;

/// Log targets used by this crate. Filter on these in `RUST_LOG`, e.g.
/// `RUST_LOG=info,stream_client=debug`. Only runtime lifecycle events log
/// under the crate path.
pub const TARGETS: &[&str] = &[
    "agisfl_core",
    "stream_client",
    "stream_transport",
    "backend",
    "backend_api",
    "preferences",
    "agisfl_config",
];

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,agisfl_core=info,stream_client=info,stream_transport=info,backend=info,\
backend_api=info,preferences=info,agisfl_config=info,agisfl_monitor=info";

/// Install the global fmt subscriber, filtered by `RUST_LOG`.
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
