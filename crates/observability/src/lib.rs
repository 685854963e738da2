//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide logging with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(subscriber::LogConfig::default());
}

/// Subscriber configuration (filters, output format).
pub mod subscriber;
