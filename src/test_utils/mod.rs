//! Test utilities for buildpack-notify
//!
//! In-process stand-ins for the platform API and the mail transport, plus
//! fixture constructors, so the pipeline can be exercised without a network.
//!
//! # Example
//!
//! ```rust,no_run
//! use buildpack_notify::models::SpaceRole;
//! use buildpack_notify::test_utils::{FakePlatform, RecordingMailer, fixtures};
//!
//! let platform = FakePlatform::default()
//!     .with_buildpack(fixtures::buildpack("bp-1", "python_buildpack", "2016-06-08T16:41:45Z"))
//!     .with_app(fixtures::app("app-1", "x", "space-1"))
//!     .with_role("space-1", SpaceRole::Manager, "u-1", "m@example.com");
//! let mailer = RecordingMailer::default();
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakePlatform, RecordingMailer, SentEmail};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set that level is used;
/// otherwise `RUST_LOG` is honoured, and without either nothing is logged.
///
/// ```bash
/// RUST_LOG=buildpack_notify=debug cargo test
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
            .try_init();
    });
}
