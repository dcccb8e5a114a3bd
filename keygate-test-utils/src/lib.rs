//! Utilities for testing keygate.
//!
//! - [`stub_backend`] – a configurable key-custody backend that can be slowed down or made to hang.
//! - [`install_tracing`] – installs a test subscriber that honors `RUST_LOG`.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub mod stub_backend;

pub use keygate_types;

/// Upper bound for a single test step. Tests waiting longer than this are considered hanging.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Installs a `tracing` subscriber writing to the test output.
///
/// Defaults to `info` if `RUST_LOG` is not set. Can be called from every test, only the first call installs.
pub fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // fails if another test already installed a subscriber
    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
