//! Platform-specific utilities and cross-platform compatibility helpers
//!
//! This module hides the few platform differences xltemplate cares about:
//!
//! - Home directory resolution
//! - The name of the git executable
//! - Tilde and environment variable expansion in user-supplied paths
//!
//! # Examples
//!
//! ```rust,no_run
//! use xltemplate::utils::platform::{get_git_command, resolve_path};
//!
//! # fn example() -> anyhow::Result<()> {
//! let patterns = resolve_path("~/templates/patterns")?;
//! println!("{} will be used from {}", get_git_command(), patterns.display());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::path::PathBuf;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined, with a hint
/// about the environment variable that is usually missing.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Returns the git executable name for the current platform.
///
/// - `"git.exe"` on Windows
/// - `"git"` everywhere else
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}

/// Resolves a path with tilde expansion and environment variable substitution.
///
/// # Supported Patterns
///
/// - `~/path` - Expands to `{home}/path`
/// - `$VAR/path`, `${VAR}/path` - Expands environment variables
/// - `%VAR%\path` - Expands environment variables on Windows
///
/// # Errors
///
/// - `~user/path` forms, which are not supported
/// - Undefined environment variables (Unix-style syntax)
/// - Home directory that cannot be determined
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = if let Some(stripped) = path.strip_prefix("~/") {
        get_home_dir()?.join(stripped)
    } else if path.starts_with('~') {
        return Err(anyhow::anyhow!(
            "Invalid path: {path}\n\n\
            Tilde expansion only supports '~/' for home directory.\n\
            Use '~/' followed by a relative path, like '~/templates/main.tmpl'"
        ));
    } else {
        PathBuf::from(path)
    };

    let path_str = expanded.to_string_lossy();

    let expanded_str = if is_windows() && path_str.contains('%') {
        let mut result = path_str.to_string();
        let re = Regex::new(r"%([^%]+)%").context("Invalid Windows variable pattern")?;

        for cap in re.captures_iter(&path_str) {
            if let Some(var_name) = cap.get(1)
                && let Ok(value) = std::env::var(var_name.as_str())
            {
                result = result.replace(&format!("%{}%", var_name.as_str()), &value);
            }
        }

        match shellexpand::env(&result) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => result,
        }
    } else {
        shellexpand::env(&path_str)
            .with_context(|| {
                format!(
                    "Failed to expand environment variables in path: {path_str}\n\n\
                    Common issues:\n\
                    - Undefined environment variable (e.g., $UNDEFINED_VAR)\n\
                    - Invalid variable syntax (use $VAR or ${{VAR}})"
                )
            })?
            .into_owned()
    };

    Ok(PathBuf::from(expanded_str))
}
