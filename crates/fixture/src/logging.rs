//! Test logging.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "docfix_fixture=debug,docfix_memstore=info";

/// Install a test-friendly subscriber. Safe to call from every test.
///
/// Output goes through the test harness capture, so it only shows for
/// failing tests or with `--nocapture`.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
