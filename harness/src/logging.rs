//! Diagnostic tracing for the harness itself.
//!
//! Tracing events describe what the harness is doing (checkpoint loads,
//! bounded block deadlines, recorder state). They go to stderr and never mix
//! with the [`Observer`](crate::handler::Observer) stream, which carries the
//! test results a user reads and the recorder's echo.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins over `default_directive`; an unparsable directive falls
/// back to [`DEFAULT_FILTER`]. Later calls keep the first subscriber.
pub fn init(default_directive: &str) {
    let from_env = std::env::var("RUST_LOG").ok();
    let filter = resolve_filter(from_env.as_deref(), default_directive);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

fn resolve_filter(from_env: Option<&str>, default_directive: &str) -> EnvFilter {
    from_env
        .into_iter()
        .chain([default_directive])
        .find_map(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_configured_directive() {
        let filter = resolve_filter(Some("harness=debug"), "info");
        assert_eq!(filter.to_string(), "harness=debug");
    }

    #[test]
    fn configured_directive_applies_without_environment() {
        let filter = resolve_filter(None, "harness=trace");
        assert_eq!(filter.to_string(), "harness=trace");
    }
}
