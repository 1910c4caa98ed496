use tracing_subscriber::fmt::time::UtcTime;

use crate::config;

/// Installs the JSON subscriber on stderr. Safe to call more than once; later
/// calls are no-ops.
pub fn init_logging() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(config::log_filter())
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init();
}
