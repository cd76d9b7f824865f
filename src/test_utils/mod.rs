//! Test utilities for xltemplate
//!
//! Shared helpers for unit and integration tests: logging set-up and
//! fixture git repositories for remote sources.
//!
//! # Example
//!
//! ```rust,no_run
//! use xltemplate::test_utils::{TestGit, init_test_logging};
//!
//! # fn example() -> anyhow::Result<()> {
//! init_test_logging(None);
//!
//! let temp = tempfile::tempdir()?;
//! let repo = TestGit::new(temp.path().join("templates"));
//! repo.init()?;
//! repo.write_file("main.tmpl", "Hello {{.name}}")?;
//! repo.commit_all("Initial templates")?;
//! let url = repo.file_url();
//! # Ok(())
//! # }
//! ```

pub mod git_helper;

pub use git_helper::TestGit;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `Some(level)` that level is used;
/// with `None` logging is enabled only when `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
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
