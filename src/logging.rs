//! logging
//!
//! Diagnostic logging via `tracing`.
//!
//! Diagnostics go to stderr so stdout stays clean for command output. The
//! default level follows the CLI verbosity; `RUST_LOG` overrides it.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ui::output::Verbosity;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Default filter directive for a verbosity level.
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "paperboard=error",
        Verbosity::Normal => "paperboard=warn",
        Verbosity::Debug => "paperboard=debug,info",
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init(),
    };
    // Already installed (tests, embedding)
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_by_verbosity() {
        assert_eq!(default_directive(Verbosity::Quiet), "paperboard=error");
        assert!(default_directive(Verbosity::Debug).contains("debug"));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(Verbosity::Normal, LogFormat::Compact);
        init(Verbosity::Debug, LogFormat::Json);
    }
}
