//! xltemplate - render documents from templates, patterns and layered variables
//!
//! xltemplate renders a target document, typically a release or variable
//! file for a deployment, from three inputs:
//!
//! - a **source**: the main template, a local file or a file inside a git
//!   repository
//! - **patterns**: directories of reusable sub-templates, each registered
//!   under its file name and callable with `include`
//! - **variables**: a YAML mapping that may pull further YAML files in
//!   through its `:includes` key
//!
//! Templates use the Go `text/template` language with a broad helper
//! library. A value missing from the variables renders as `<no value>`
//! rather than failing; such lines are reported as warnings afterwards.
//!
//! # Modules
//!
//! - [`source`] - source strings, remote checkouts and root-confined file access
//! - [`variables`] - YAML loading, key normalization and includes
//! - [`patterns`] - recursive pattern collection
//! - [`template`] - the template language, registry and function library
//! - [`scanner`] - detection of unresolved references in rendered text
//! - [`render`] - the end-to-end pipeline
//! - [`config`] - build files and their merge with command-line flags
//! - [`cli`] - the `build` and `version` commands
//! - [`core`] - error types and user-facing error reporting
//! - [`git`] - the system git wrapper used for remote sources
//! - [`utils`] - file system, path confinement and platform helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use xltemplate::render::{BuildOptions, Renderer};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let result = Renderer::new()
//!     .render(&BuildOptions {
//!         source: "templates/release.tmpl".to_string(),
//!         variables: Some("env/prod.yaml".into()),
//!         patterns: vec!["templates/patterns".to_string()],
//!     })
//!     .await?;
//!
//! for warning in &result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! print!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod git;
pub mod patterns;
pub mod render;
pub mod scanner;
pub mod source;
pub mod template;
pub mod utils;
pub mod variables;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
