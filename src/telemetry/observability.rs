//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Structured logging with JSON output option
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Spans tying log lines to the file or scan that produced them

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing with the given level and output format.
///
/// # Panics
///
/// Panics if tracing subscriber has already been initialized in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).with_thread_names(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
}

/// Span constructors shared by the monitor tasks.
pub mod spans {
    use std::path::Path;

    use tracing::{info_span, Span};

    /// Span covering the whole lifecycle of one file.
    #[must_use]
    pub fn file_span(path: &Path) -> Span {
        info_span!("file", path = %path.display())
    }

    /// Span covering the poll loop of one watched directory.
    #[must_use]
    pub fn monitor_span(directory: &Path) -> Span {
        info_span!("monitor", directory = %directory.display())
    }
}
