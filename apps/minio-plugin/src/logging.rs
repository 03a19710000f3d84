//! Structured logging setup using tracing.
//!
//! JSON output by default for log aggregation; `--pretty` switches to the
//! human-readable formatter. Logs go to stderr so stdout carries only
//! command results.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
///
/// * `filter` - The log filter directive (e.g., "info,xavyo_secrets_minio=debug")
/// * `pretty` - Use the human-readable formatter instead of JSON
pub fn init_logging(filter: &str, pretty: bool) {
    let filter_layer = match EnvFilter::try_new(filter) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("FATAL: Failed to create log filter: {e}");
            std::process::exit(1);
        }
    };

    let registry = tracing_subscriber::registry().with(filter_layer);

    if pretty {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    }

    tracing::debug!(filter = %filter, "Logging initialized");
}

/// Initialize logging for tests (with simpler output).
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_logging_is_repeatable() {
        init_test_logging();
        init_test_logging();
    }
}
