//! Tracing/logging initialization.
//!
//! Production logs are JSON lines with timestamps. `RUST_LOG` always wins over
//! the filter passed in, so operators can raise verbosity without a redeploy.

use tracing_subscriber::EnvFilter;

fn filter_or(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the JSON subscriber, reporting whether one was already set.
pub fn try_init(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_filter))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("tracing subscriber already installed: {err}"))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_with_filter(default_filter: &str) {
    let _ = try_init(default_filter);
}

/// Human-readable output routed through the test harness's capture.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_reported_not_fatal() {
        init_with_filter("warn");
        assert!(try_init("warn").is_err());
        init_with_filter("warn");
        ::tracing::info!("still logging after repeated init");
    }
}
