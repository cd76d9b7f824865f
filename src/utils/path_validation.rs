//! Path confinement for loaders.
//!
//! Every file a render reads goes through [`confine_path`], which resolves a
//! requested path against a canonical root and refuses anything that ends up
//! outside it, whether through `..` components, absolute paths or symlinks.

use crate::core::XltError;
use std::path::{Component, Path, PathBuf};

/// Checks lexically that a relative path never climbs above its starting point.
///
/// `a/../b` is fine, `a/../../b` is not.
pub fn validate_no_traversal(path: &Path) -> bool {
    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Resolves `requested` inside `root` and returns its canonical path.
///
/// `root` must already be canonical. Relative paths are joined onto the root;
/// absolute paths are accepted only when they resolve inside it.
///
/// # Errors
///
/// - [`XltError::OutsideRoot`] if the path escapes the root lexically or
///   after following symlinks
/// - [`XltError::NotFound`] if the path does not exist
pub fn confine_path(root: &Path, requested: &Path) -> Result<PathBuf, XltError> {
    let outside = || XltError::OutsideRoot {
        path: requested.display().to_string(),
        root: root.display().to_string(),
    };

    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        if !validate_no_traversal(requested) {
            return Err(outside());
        }
        root.join(requested)
    };

    if !candidate.exists() {
        return Err(XltError::NotFound {
            path: requested.display().to_string(),
        });
    }

    let canonical = candidate.canonicalize()?;
    if !canonical.starts_with(root) {
        return Err(outside());
    }

    Ok(canonical)
}
