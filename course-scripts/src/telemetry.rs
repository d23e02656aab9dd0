//! Logging setup

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Set up the global logger
///
/// Defaults to INFO unless overridden by `RUST_LOG`. JSON output flattens
/// event fields into the top-level object
pub fn setup_logging(json_logs: bool) {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if json_logs {
        let layer = fmt::layer().with_file(true).with_line_number(true).json().flatten_event(true);
        registry.with(layer).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}
