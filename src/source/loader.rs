//! Root-confined file access.

use std::path::{Path, PathBuf};

use crate::core::XltError;
use crate::utils::fs::TempDir;
use crate::utils::path_validation::confine_path;

/// Read access to files under one confined root.
///
/// A loader for a local directory is rooted at that directory; a loader for a
/// local file is rooted at the file's parent and remembers the file as its
/// target. Remote loaders additionally own the temporary checkout backing the
/// root, which is removed by [`FileLoader::cleanup`] or, failing that, on drop.
#[derive(Debug)]
pub struct FileLoader {
    root: PathBuf,
    file: Option<PathBuf>,
    checkout: Option<TempDir>,
}

impl FileLoader {
    /// Builds a loader for an existing local path.
    ///
    /// # Errors
    ///
    /// - [`XltError::NotFound`] if `target` does not exist
    /// - [`XltError::InvalidTarget`] if it is neither a regular file nor a directory
    pub fn local(target: &Path) -> Result<Self, XltError> {
        Self::at(target, None)
    }

    /// Builds a loader for `target` inside a checkout it takes ownership of.
    pub(crate) fn in_checkout(target: &Path, checkout: TempDir) -> Result<Self, XltError> {
        Self::at(target, Some(checkout))
    }

    fn at(target: &Path, checkout: Option<TempDir>) -> Result<Self, XltError> {
        let metadata = std::fs::metadata(target).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => XltError::NotFound {
                path: target.display().to_string(),
            },
            _ => XltError::IoError(e),
        })?;

        if metadata.is_dir() {
            return Ok(Self {
                root: target.canonicalize()?,
                file: None,
                checkout,
            });
        }

        if !metadata.is_file() {
            return Err(XltError::InvalidTarget {
                path: target.display().to_string(),
                reason: "expected a regular file or a directory".to_string(),
            });
        }

        let canonical = target.canonicalize()?;
        let (root, file) = match (canonical.parent(), canonical.file_name()) {
            (Some(parent), Some(name)) => (parent.to_path_buf(), PathBuf::from(name)),
            _ => {
                return Err(XltError::InvalidTarget {
                    path: target.display().to_string(),
                    reason: "file has no parent directory".to_string(),
                });
            }
        };

        Ok(Self {
            root,
            file: Some(file),
            checkout,
        })
    }

    /// The canonical root all access is confined to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The target file relative to [`root`](Self::root), if the loader was built from a file.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Location of the temporary checkout for remote loaders.
    pub fn checkout_path(&self) -> Option<&Path> {
        self.checkout.as_ref().map(TempDir::path)
    }

    pub fn is_remote(&self) -> bool {
        self.checkout.is_some()
    }

    /// Reads a file inside the root.
    ///
    /// Relative paths are taken relative to the root; absolute paths must
    /// resolve inside it.
    ///
    /// # Errors
    ///
    /// - [`XltError::OutsideRoot`] if the path escapes the root
    /// - [`XltError::NotFound`] if it does not exist
    /// - [`XltError::InvalidTarget`] if it is a directory
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, XltError> {
        let path = path.as_ref();
        let confined = confine_path(&self.root, path)?;
        if confined.is_dir() {
            return Err(XltError::InvalidTarget {
                path: path.display().to_string(),
                reason: "expected a file, found a directory".to_string(),
            });
        }
        Ok(std::fs::read(confined)?)
    }

    /// Reads a file inside the root as UTF-8 text.
    pub fn load_to_string(&self, path: impl AsRef<Path>) -> Result<String, XltError> {
        let path = path.as_ref();
        let bytes = self.load(path)?;
        String::from_utf8(bytes).map_err(|_| XltError::InvalidTarget {
            path: path.display().to_string(),
            reason: "file is not valid UTF-8 text".to_string(),
        })
    }

    /// Reads the target file the loader was built from.
    ///
    /// # Errors
    ///
    /// [`XltError::InvalidTarget`] if the loader was built from a directory.
    pub fn load_target(&self) -> Result<String, XltError> {
        match &self.file {
            Some(file) => self.load_to_string(file),
            None => Err(XltError::InvalidTarget {
                path: self.root.display().to_string(),
                reason: "expected a file, found a directory".to_string(),
            }),
        }
    }

    /// Releases the temporary checkout, if any.
    ///
    /// Local loaders own no state and this is a no-op for them.
    pub fn cleanup(self) -> anyhow::Result<()> {
        if let Some(checkout) = self.checkout {
            tracing::debug!("Removing checkout {}", checkout.path().display());
            checkout.close()?;
        }
        Ok(())
    }
}
