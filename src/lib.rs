pub mod browser;
pub mod collector;
pub mod enricher;
pub mod extract;
pub mod merge;
pub mod models;
pub mod storage;

use tracing_subscriber::EnvFilter;

/// Set up logging for a binary. `RUST_LOG` wins when set; otherwise the
/// `--debug` flag picks the level.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
