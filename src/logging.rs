//! Logging setup.
//!
//! The library only emits `tracing` events; binaries and tests choose
//! where they go.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global fmt subscriber.
///
/// # Environment
/// - `RUST_LOG`: filter directives (default `info`),
///   e.g. `RUST_LOG=u_match=debug`
///
/// # Example
/// ```no_run
/// u_match::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// Test subscriber at `debug`, captured by the test harness.
///
/// Safe to call from every test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
