//! Error handling for xltemplate
//!
//! This module provides the error taxonomy of the render pipeline and user-friendly
//! error reporting for the CLI. The error system is built around two types:
//! - [`XltError`] - Enumerated error types for every failure case of a render
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! # Error Categories
//!
//! - **Sources**: [`XltError::NotFound`], [`XltError::InvalidTarget`],
//!   [`XltError::OutsideRoot`], [`XltError::InvalidSourceSpec`]
//! - **Remote checkouts**: [`XltError::RemoteFetchFailed`], [`XltError::GitNotFound`],
//!   [`XltError::GitCommandError`]
//! - **Documents**: [`XltError::ParseError`], [`XltError::MergeError`]
//! - **Templates**: [`XltError::CompileError`], [`XltError::ExecutionError`]
//!
//! # Propagation
//!
//! Only some of these abort a render. A [`XltError::MergeError`] or a
//! [`XltError::ParseError`] raised for an *included* variables document is
//! reported and the include is skipped; the same errors on the primary
//! document, the source, or the registry are fatal.
//!
//! # Examples
//!
//! ```rust,no_run
//! use xltemplate::core::{XltError, ErrorContext, user_friendly_error};
//!
//! let error = XltError::NotFound { path: "templates/main.tmpl".to_string() };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for xltemplate operations.
///
/// Each variant names one failure mode of the pipeline and carries the
/// information needed to explain it to a user. Variants are matched by
/// [`user_friendly_error`] to attach suggestions.
#[derive(Error, Debug)]
pub enum XltError {
    /// A source, variables file, or pattern root does not exist.
    #[error("Path not found: {path}")]
    NotFound {
        /// The path as given by the user
        path: String,
    },

    /// The path exists but is the wrong kind of file for its role.
    #[error("Invalid target '{path}': {reason}")]
    InvalidTarget {
        /// The offending path
        path: String,
        /// What kind of entry was expected
        reason: String,
    },

    /// A path resolves outside the root its loader is confined to.
    #[error("Path '{path}' escapes the confined root {root}")]
    OutsideRoot {
        /// The requested path
        path: String,
        /// The root the loader is restricted to
        root: String,
    },

    /// A source string looked like a repository reference but could not be parsed.
    #[error("Invalid source specification '{spec}': {reason}")]
    InvalidSourceSpec {
        /// The raw source string
        spec: String,
        /// Why it was rejected
        reason: String,
    },

    /// Cloning or checking out a remote repository failed.
    #[error("Failed to fetch remote source {url}")]
    RemoteFetchFailed {
        /// Repository URL with credentials stripped
        url: String,
        /// Git's explanation
        reason: String,
    },

    /// A git command returned a non-zero status.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git subcommand that failed
        operation: String,
        /// Captured standard error
        stderr: String,
    },

    /// The git executable is not available.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A YAML document is malformed or has a key that cannot become a string.
    #[error("Failed to parse {file}: {reason}")]
    ParseError {
        /// Document path
        file: String,
        /// Parser message
        reason: String,
    },

    /// The template registry could not be built.
    #[error("Template compilation failed: {message}")]
    CompileError {
        /// Engine message including template name and line
        message: String,
    },

    /// Rendering failed for a reason other than an unresolved reference.
    #[error("Template execution failed: {message}")]
    ExecutionError {
        /// Engine message including template name and line
        message: String,
    },

    /// An includes entry could not be merged.
    #[error("Cannot merge includes from {file}: {reason}")]
    MergeError {
        /// Document declaring or being included
        file: String,
        /// What went wrong
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for XltError {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound {
                path,
            } => Self::NotFound {
                path: path.clone(),
            },
            Self::InvalidTarget {
                path,
                reason,
            } => Self::InvalidTarget {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::OutsideRoot {
                path,
                root,
            } => Self::OutsideRoot {
                path: path.clone(),
                root: root.clone(),
            },
            Self::InvalidSourceSpec {
                spec,
                reason,
            } => Self::InvalidSourceSpec {
                spec: spec.clone(),
                reason: reason.clone(),
            },
            Self::RemoteFetchFailed {
                url,
                reason,
            } => Self::RemoteFetchFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::ParseError {
                file,
                reason,
            } => Self::ParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::CompileError {
                message,
            } => Self::CompileError {
                message: message.clone(),
            },
            Self::ExecutionError {
                message,
            } => Self::ExecutionError {
                message: message.clone(),
            },
            Self::MergeError {
                file,
                reason,
            } => Self::MergeError {
                file: file.clone(),
                reason: reason.clone(),
            },
            // io::Error is not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Wraps an [`XltError`] with optional details and a suggestion, and knows
/// how to print itself to stderr with terminal colors.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: XltError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: XltError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr, red for the error, yellow for details and
    /// green for the suggestion.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for display.
///
/// Known [`XltError`] variants get tailored suggestions; IO errors are mapped
/// to their closest variant; everything else keeps its full `anyhow` chain
/// in the message so no diagnostic is lost.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(xlt_error) = error.downcast_ref::<XltError>() {
        let mut ctx = create_error_context(xlt_error.clone());
        // Keep the outer context messages added along the way
        if ctx.details.is_none() && error.chain().count() > 1 {
            ctx.details = Some(error.to_string());
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(XltError::NotFound {
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details(error.to_string());
            }
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(XltError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check the file permissions of the inputs and the output location");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(XltError::Other {
        message,
    })
}

fn create_error_context(error: XltError) -> ErrorContext {
    match &error {
        XltError::NotFound { path } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Check that '{path}' exists and is spelled correctly"))
            .with_details("Sources, variables files and pattern directories must exist before rendering"),

        XltError::InvalidTarget { .. } => ErrorContext::new(error.clone())
            .with_suggestion("--source and --variables take files, --patterns takes directories"),

        XltError::OutsideRoot { root, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Keep referenced files inside {root}"))
            .with_details("File access is confined to the resolved root to prevent path traversal"),

        XltError::InvalidSourceSpec { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Use a local path or a repository reference such as https://github.com/org/repo//path?ref=v1.0.0"),

        XltError::RemoteFetchFailed { url, reason } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Verify the repository URL is correct: {url}. Check your network connection, credentials and the requested ref"
            ))
            .with_details(reason.trim().to_string()),

        XltError::GitNotFound => ErrorContext::new(XltError::GitNotFound)
            .with_suggestion("Install git from https://git-scm.com/ or your package manager (e.g., 'brew install git', 'apt install git')")
            .with_details("Remote sources are checked out with the system git executable"),

        XltError::GitCommandError { stderr, .. } => ErrorContext::new(error.clone())
            .with_suggestion("Try running the git command manually for more details")
            .with_details(stderr.trim().to_string()),

        XltError::ParseError { file, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check the YAML syntax in {file}. Mapping keys must be strings, numbers or booleans"
            )),

        XltError::CompileError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check template syntax: actions use {{ }}, blocks close with {{end}}, functions must exist")
            .with_details("A single malformed pattern invalidates the whole registry"),

        XltError::ExecutionError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check argument counts and types of the functions used, and the names passed to include"),

        XltError::MergeError { .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!("'{}' must be a list of YAML file paths", crate::constants::INCLUDES_KEY)),

        _ => ErrorContext::new(error.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = XltError::GitNotFound;
        assert_eq!(error.to_string(), "Git is not installed or not found in PATH");

        let error = XltError::NotFound {
            path: "main.tmpl".to_string(),
        };
        assert_eq!(error.to_string(), "Path not found: main.tmpl");

        let error = XltError::OutsideRoot {
            path: "../secret".to_string(),
            root: "/work".to_string(),
        };
        assert_eq!(error.to_string(), "Path '../secret' escapes the confined root /work");
    }

    #[test]
    fn test_error_context() {
        let ctx = ErrorContext::new(XltError::GitNotFound)
            .with_suggestion("Install git using your package manager")
            .with_details("Git is required for remote sources");

        assert_eq!(ctx.suggestion, Some("Install git using your package manager".to_string()));
        assert_eq!(ctx.details, Some("Git is required for remote sources".to_string()));

        let display = format!("{ctx}");
        assert!(display.contains("Git is not installed or not found in PATH"));
        assert!(display.contains("Suggestion: Install git"));
    }

    #[test]
    fn test_user_friendly_error_keeps_variant() {
        let err = anyhow::Error::from(XltError::CompileError {
            message: "template: main.tmpl:3: unexpected {{end}}".to_string(),
        });
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, XltError::CompileError { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_io_not_found() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let ctx = user_friendly_error(anyhow::Error::from(io_error));
        assert!(matches!(ctx.error, XltError::NotFound { .. }));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let err = anyhow::anyhow!("root cause").context("while rendering");
        let ctx = user_friendly_error(err);
        let text = ctx.error.to_string();
        assert!(text.contains("while rendering"));
        assert!(text.contains("Caused by:"));
        assert!(text.contains("root cause"));
    }

    #[test]
    fn test_clone_io_error_becomes_other() {
        let err = XltError::from(std::io::Error::other("boom"));
        match err.clone() {
            XltError::Other {
                message,
            } => assert!(message.contains("boom")),
            _ => panic!("Expected Other"),
        }
    }
}
