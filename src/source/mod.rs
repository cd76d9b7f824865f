//! Source resolution: from a source string to a root-confined [`FileLoader`].
//!
//! A source string names either a local path or a path inside a git
//! repository (see [`spec`] for the accepted forms). Local sources are
//! confined to the directory itself, or to the parent of a file. Remote
//! sources are cloned into a fresh, uniquely named temporary directory that
//! the returned loader owns; it is deleted when the loader is cleaned up or
//! dropped, and immediately when resolution fails.
//!
//! # Examples
//!
//! ```rust,no_run
//! use xltemplate::source::{SourceResolver, SourceSpec};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = SourceResolver::new();
//! let spec = SourceSpec::parse("https://github.com/org/templates//main.tmpl?ref=v1.0.0")?;
//! let loader = resolver.resolve(&spec).await?;
//! let text = loader.load_target()?;
//! loader.cleanup()?;
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod spec;

pub use loader::FileLoader;
pub use spec::{RepoSpec, SourceSpec};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::CHECKOUT_DIR_PREFIX;
use crate::core::XltError;
use crate::git::{GitRepo, ensure_git_available};
use crate::utils::fs::TempDir;
use crate::utils::path_validation::confine_path;
use crate::utils::platform::resolve_path;

/// Turns [`SourceSpec`]s into [`FileLoader`]s.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    temp_root: PathBuf,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::with_temp_root(std::env::temp_dir())
    }
}

impl SourceResolver {
    /// A resolver that checks remote sources out under the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that checks remote sources out under `temp_root`.
    pub fn with_temp_root(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
        }
    }

    /// Parses and resolves a source string.
    pub async fn resolve_str(&self, spec: &str) -> Result<FileLoader> {
        let parsed = SourceSpec::parse(spec)?;
        self.resolve(&parsed).await
    }

    /// Resolves a parsed specification.
    ///
    /// # Errors
    ///
    /// - [`XltError::NotFound`] / [`XltError::InvalidTarget`] for bad local paths
    ///   or subpaths inside a checkout
    /// - [`XltError::RemoteFetchFailed`] if the clone or the checkout of the ref fails
    /// - [`XltError::GitNotFound`] if a remote source is used without git installed
    pub async fn resolve(&self, spec: &SourceSpec) -> Result<FileLoader> {
        match spec {
            SourceSpec::Local {
                path,
            } => {
                let expanded = resolve_path(&path.to_string_lossy()).map_err(|e| {
                    XltError::InvalidSourceSpec {
                        spec: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                tracing::debug!("Resolving local source {}", expanded.display());
                Ok(FileLoader::local(&expanded)?)
            }
            SourceSpec::Remote(repo) => self.resolve_remote(repo).await,
        }
    }

    async fn resolve_remote(&self, repo: &RepoSpec) -> Result<FileLoader> {
        tracing::debug!("Resolving remote source {}", repo);
        ensure_git_available().await?;

        std::fs::create_dir_all(&self.temp_root).with_context(|| {
            format!("Failed to create checkout directory {}", self.temp_root.display())
        })?;
        // Dropping `checkout` on any early return removes the clone
        let checkout = TempDir::new_in(&self.temp_root, CHECKOUT_DIR_PREFIX)?;

        let git_repo = GitRepo::clone(&repo.clone_url, checkout.path()).await?;
        if let Some(reference) = &repo.reference {
            git_repo.checkout(reference).await.map_err(|e| {
                let reason = match e.downcast_ref::<XltError>() {
                    Some(XltError::GitCommandError {
                        stderr,
                        ..
                    }) => format!("cannot check out '{reference}': {}", stderr.trim()),
                    _ => format!("cannot check out '{reference}': {e}"),
                };
                XltError::RemoteFetchFailed {
                    url: repo.to_string(),
                    reason,
                }
            })?;
        }

        let checkout_root = checkout.path().canonicalize()?;
        let target = if repo.subpath.is_empty() {
            checkout_root.clone()
        } else {
            confine_path(&checkout_root, Path::new(&repo.subpath))?
        };

        let loader = FileLoader::in_checkout(&target, checkout)?;
        tracing::debug!(
            "Checked out {} into {}",
            repo,
            loader.checkout_path().map(|p| p.display().to_string()).unwrap_or_default()
        );
        Ok(loader)
    }
}
