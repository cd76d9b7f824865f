//! Global constants used throughout the xltemplate codebase.
//!
//! This module contains reserved keys, markers, timeouts, and other
//! values shared across modules. Defining them centrally keeps magic
//! strings discoverable.

use std::time::Duration;

/// Reserved top-level key of a variables document listing further documents to merge in.
///
/// The key is consumed by [`crate::variables::load_with_includes`] and never
/// reaches the rendered data.
pub const INCLUDES_KEY: &str = ":includes";

/// Placeholder printed in place of a value that is absent from the data.
///
/// The template engine emits it for unresolved references and the
/// [`crate::scanner`] looks for it in rendered output.
pub const NO_VALUE_MARKER: &str = "<no value>";

/// Timeout for Git clone operations (120 seconds).
///
/// Clone operations may take a while for large repositories, but a hung
/// connection must not block a render forever.
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for Git checkout operations (60 seconds).
pub const GIT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix of the temporary directories holding remote checkouts.
pub const CHECKOUT_DIR_PREFIX: &str = "checkout";

/// Maximum nesting of `include`/`template` calls during a single execution.
///
/// Same ceiling as Go's `text/template`. Recursion bounded by the data renders
/// to any practical depth; only runaway recursion reaches it.
pub const MAX_TEMPLATE_DEPTH: usize = 100_000;

/// Stack size of the thread a template executes on.
///
/// Each nested call costs a few native frames, so execution runs on its own
/// thread with room for deep recursion. The memory is reserved, not committed.
pub const TEMPLATE_STACK_SIZE: usize = 1 << 30;

/// Version string reported by the `version` command.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
