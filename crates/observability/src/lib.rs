//! Tracing and logging setup shared by every fiberstock process.

/// Initialize process-wide logging with the default `info` filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with_filter("info");
}

pub use self::tracing::{init_test, init_with_filter, try_init};

/// Tracing configuration (filters, layers).
pub mod tracing;
