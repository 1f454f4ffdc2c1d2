//! Fakes and builders shared by the data-manager integration tests.
//!
//! Every fake records what the code under test asked of it, so tests assert
//! on calls and writes rather than on log output.

pub mod builders;
pub mod fake_cluster;
pub mod fake_process;
pub mod fake_store;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Captured output only shows for failing tests. The level comes from
/// `DATA_MANAGER_LOG`, defaulting to `debug` so the report tree of a failing
/// job is visible in full.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var("DATA_MANAGER_LOG")
            .ok()
            .and_then(|level| EnvFilter::try_new(level).ok())
            .unwrap_or_else(|| EnvFilter::new("debug"));

        // Another harness may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .try_init();
    });
}
