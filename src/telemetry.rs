//! Tracing bootstrap for binaries, demos, and tests.

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing with an env-filter (`RUST_LOG`, defaulting to
/// `info`), a fmt layer, and span-trace capture for error reports. Loads
/// `.env` first so filter and API-key variables can live there.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}
