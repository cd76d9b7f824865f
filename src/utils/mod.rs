//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - Atomic output writes and self-removing temporary directories
//! - [`path_validation`] - Confinement of requested paths to a resolved root
//! - [`platform`] - Platform-specific helpers and path expansion

pub mod fs;
pub mod path_validation;
pub mod platform;
