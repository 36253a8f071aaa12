//! Test utilities for conda-inspect
//!
//! Helpers shared by unit and integration tests, available with the
//! `test-utils` feature:
//!
//! - [`init_test_logging`] wires `tracing` output into the test harness
//! - [`CondaTreeFixture`] writes Conda installation layouts into a temporary
//!   directory
//! - [`fixtures`] holds sample manifest contents
//!
//! # Example
//!
//! ```rust,no_run
//! use conda_inspect::test_utils::{CondaTreeFixture, InstalledPackage};
//!
//! let tree = CondaTreeFixture::new("rootfs").unwrap();
//! tree.install("opt/conda", &InstalledPackage::new("zlib", "1.2.13", "h5eee18b_0")).unwrap();
//! assert!(tree.root().join("opt/conda/conda-meta/zlib-1.2.13-h5eee18b_0.json").exists());
//! ```

pub mod fixtures;

pub use fixtures::{CondaTreeFixture, InstalledPackage};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `Some(level)` that level is used;
/// with `None` the `RUST_LOG` environment variable decides, and nothing is
/// logged when it is unset.
///
/// ```bash
/// RUST_LOG=conda_inspect=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
