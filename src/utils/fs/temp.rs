//! Temporary directory management with RAII cleanup.
//!
//! This module provides a `TempDir` struct that removes its directory when
//! dropped. Remote checkouts live in one of these so that no exit path can
//! leave a clone behind.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A uniquely named temporary directory that is deleted on drop.
///
/// Names combine a prefix with a v4 UUID, so concurrent renders never share
/// a checkout location.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
    removed: bool,
}

impl TempDir {
    /// Create a new directory under `parent`.
    pub fn new_in(parent: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let unique_name = format!("xltemplate_{}_{}", prefix, uuid::Uuid::new_v4());
        let path = parent.as_ref().join(unique_name);

        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create temporary directory: {}", path.display()))?;

        Ok(Self {
            path,
            removed: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, reporting failures instead of swallowing them.
    pub fn close(mut self) -> Result<()> {
        self.removed = true;
        remove_if_exists(&self.path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if !self.removed {
            let _ = remove_if_exists(&self.path);
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove temporary directory: {}", path.display()))?;
    }
    Ok(())
}
