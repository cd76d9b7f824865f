//! Core types and error handling for xltemplate.
//!
//! Everything in the render pipeline reports failures through [`XltError`],
//! and the CLI turns any error into an [`ErrorContext`] with
//! [`user_friendly_error`] before printing it.

pub mod error;

pub use error::{ErrorContext, XltError, user_friendly_error};
