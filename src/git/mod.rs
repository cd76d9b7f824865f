//! Git operations wrapper for xltemplate
//!
//! Remote template sources are checked out with the system `git` binary
//! rather than an embedded implementation, so SSH agents, credential helpers
//! and the user's git configuration all apply unchanged.
//!
//! Only the handful of operations a render needs live here: cloning into an
//! ephemeral directory, checking out a ref, and checking that git exists.
//! Every invocation goes through [`command_builder::GitCommand`].
//!
//! # Security Considerations
//!
//! - Credentials embedded in HTTPS URLs are stripped before URLs are logged
//!   or put into error messages, see [`strip_auth_from_url`]
//! - Terminal prompts are disabled, so an authentication failure fails fast

pub mod command_builder;

#[cfg(test)]
mod tests;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::constants::{GIT_CHECKOUT_TIMEOUT, GIT_CLONE_TIMEOUT};
use crate::core::XltError;
use command_builder::GitCommand;

/// A handle to a local git working tree.
#[derive(Debug)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Creates a handle for an existing repository without verifying it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Clones `url` into `target`.
    ///
    /// # Errors
    ///
    /// [`XltError::RemoteFetchFailed`] if git cannot clone the repository,
    /// [`XltError::GitNotFound`] if git is not installed.
    pub async fn clone(url: &str, target: impl AsRef<Path>) -> Result<Self> {
        let target_path = target.as_ref();
        let display_url = strip_auth_from_url(url);

        GitCommand::clone(url, target_path)
            .with_timeout(Some(GIT_CLONE_TIMEOUT))
            .with_context(display_url.clone())
            .execute_success()
            .await
            .map_err(|e| match e.downcast::<XltError>() {
                Ok(XltError::RemoteFetchFailed {
                    reason,
                    ..
                }) => XltError::RemoteFetchFailed {
                    url: display_url.clone(),
                    reason,
                }
                .into(),
                Ok(other) => other.into(),
                Err(e) => e,
            })?;

        Ok(Self::new(target_path))
    }

    /// Checks out `ref_name` as a detached HEAD.
    ///
    /// Tags and commits are tried directly, then the remote-tracking branch
    /// `origin/<ref>`, and finally a fetch of the ref from origin.
    ///
    /// # Errors
    ///
    /// [`XltError::GitCommandError`] naming the ref if none of the attempts succeed.
    pub async fn checkout(&self, ref_name: &str) -> Result<()> {
        let direct_err = match self.checkout_quiet(ref_name).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let remote_ref = format!("origin/{ref_name}");
        if self.checkout_quiet(&remote_ref).await.is_ok() {
            return Ok(());
        }

        tracing::debug!(target: "git", "Ref {} not present locally, fetching", ref_name);
        if let Err(e) = GitCommand::fetch_ref(ref_name)
            .current_dir(&self.path)
            .with_timeout(Some(GIT_CLONE_TIMEOUT))
            .execute_success()
            .await
        {
            tracing::debug!(target: "git", "Fetching {} failed: {}", ref_name, e);
            return Err(direct_err);
        }

        self.checkout_quiet("FETCH_HEAD").await
    }

    async fn checkout_quiet(&self, reference: &str) -> Result<()> {
        GitCommand::checkout(reference)
            .current_dir(&self.path)
            .with_timeout(Some(GIT_CHECKOUT_TIMEOUT))
            .execute_success()
            .await
    }
}

/// Checks whether a working git binary is on the PATH.
pub async fn is_git_installed() -> bool {
    GitCommand::version()
        .with_timeout(Some(GIT_CHECKOUT_TIMEOUT))
        .execute()
        .await
        .is_ok_and(|output| output.stdout.starts_with("git version"))
}

/// Returns [`XltError::GitNotFound`] if git is unavailable.
pub async fn ensure_git_available() -> Result<()> {
    if !is_git_installed().await {
        return Err(XltError::GitNotFound.into());
    }
    Ok(())
}

/// Removes `user[:token]@` credentials from HTTP(S) URLs.
///
/// Other URL forms are returned unchanged.
pub fn strip_auth_from_url(url: &str) -> String {
    let protocol_end = if url.starts_with("https://") {
        "https://".len()
    } else if url.starts_with("http://") {
        "http://".len()
    } else {
        return url.to_string();
    };

    if let Some(at_pos) = url.find('@') {
        let first_slash = url[protocol_end..].find('/').map(|p| p + protocol_end);
        if first_slash.is_none_or(|slash| at_pos < slash) {
            return format!("{}{}", &url[..protocol_end], &url[at_pos + 1..]);
        }
    }

    url.to_string()
}
