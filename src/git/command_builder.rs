//! Type-safe Git command builder for consistent command execution
//!
//! Every git invocation xltemplate makes goes through [`GitCommand`], which
//! handles the platform binary name, `-C` working directories, timeouts,
//! output capture and the mapping of failures onto [`XltError`].

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::XltError;
use crate::utils::platform::get_git_command;

/// Builder for constructing and executing Git commands.
///
/// # Examples
///
/// ```rust,no_run
/// use xltemplate::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// GitCommand::clone("https://github.com/example/templates.git", "/tmp/checkout")
///     .with_context("templates")
///     .execute_success()
///     .await?;
///
/// GitCommand::checkout("v1.0.0")
///     .current_dir("/tmp/checkout")
///     .execute_success()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Default Configuration
///
/// - **Timeout**: 5 minutes
/// - **Output capture**: enabled
/// - **Working directory**: the current process directory
/// - **Environment**: inherited, with terminal prompts disabled
pub struct GitCommand {
    /// Arguments passed to git, in order
    args: Vec<String>,

    /// Directory passed to git via `-C`
    current_dir: Option<PathBuf>,

    /// Extra environment for the git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Identifier included in log lines
    context: Option<String>,

    /// For clone commands, the URL used in error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // A remote that asks for credentials must fail instead of hanging
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(Duration::from_secs(300)),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Creates a builder with default settings and no arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs git against `dir` (passed as `-C dir`).
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context included in debug log messages.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn full_args(&self) -> Vec<String> {
        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        full_args
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    /// Execute the command and return the output
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let full_args = self.full_args();
        let rendered = full_args.join(" ");

        let mut cmd = Command::new(git_command);
        cmd.args(&full_args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        match self.context {
            Some(ref ctx) => {
                tracing::debug!(target: "git", "({}) Executing command: {} {}", ctx, git_command, rendered);
            }
            None => tracing::debug!(target: "git", "Executing command: {} {}", git_command, rendered),
        }

        let output_future = cmd.output();
        let spawned = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result
            } else {
                tracing::warn!(
                    target: "git",
                    "Command timed out after {} seconds: git {}",
                    duration.as_secs(),
                    rendered
                );
                return Err(XltError::GitCommandError {
                    operation: self.operation(),
                    stderr: format!(
                        "Git command timed out after {} seconds. This may indicate:\n\
                        - Network connectivity issues\n\
                        - Authentication prompts waiting for input\n\
                        Try running the command manually: git {}",
                        duration.as_secs(),
                        rendered
                    ),
                }
                .into());
            }
        } else {
            output_future.await
        };

        let output = match spawned {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(XltError::GitNotFound.into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to execute git {rendered}"));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "git", "Error: {}", stderr.trim());
            }

            let reason = if stderr.is_empty() {
                stdout
            } else {
                stderr
            };
            let error = if self.args.first().is_some_and(|arg| arg == "clone") {
                XltError::RemoteFetchFailed {
                    url: self.clone_url.unwrap_or_else(|| "unknown".to_string()),
                    reason,
                }
            } else if self.args.first().is_some_and(|arg| arg == "checkout") {
                XltError::GitCommandError {
                    operation: format!(
                        "checkout {}",
                        self.args.last().cloned().unwrap_or_default()
                    ),
                    stderr: reason,
                }
            } else {
                XltError::GitCommandError {
                    operation: self.operation(),
                    stderr: reason,
                }
            };
            return Err(error.into());
        }

        if !stdout.is_empty() {
            tracing::trace!(target: "git", "{}", stdout.trim());
        }
        if !stderr.is_empty() {
            tracing::trace!(target: "git", "{}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::debug!(
                target: "git::perf",
                "Git {} took {}ms",
                self.operation(),
                elapsed.as_millis()
            );
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and check for success
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Output from a Git command
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output from the Git command
    pub stdout: String,
    /// Standard error output from the Git command
    pub stderr: String,
}

// Convenience builders for common Git operations

impl GitCommand {
    /// Create a clone command that also tracks the URL for error reporting.
    pub fn clone(url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new().args([
            "clone".to_string(),
            "--quiet".to_string(),
            url.to_string(),
            target.as_ref().display().to_string(),
        ]);
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// Create a fetch command for a single ref, leaving it in `FETCH_HEAD`.
    pub fn fetch_ref(ref_name: &str) -> Self {
        Self::new().args(["fetch", "--quiet", "origin", ref_name])
    }

    /// Create a checkout command in detached mode.
    pub fn checkout(ref_name: &str) -> Self {
        Self::new().args(["checkout", "--quiet", "--detach", ref_name])
    }

    /// Create a `git --version` command
    pub fn version() -> Self {
        Self::new().arg("--version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_basic() {
        let cmd = GitCommand::new().arg("status").arg("--short");
        assert_eq!(cmd.args, vec!["status", "--short"]);
    }

    #[tokio::test]
    async fn test_git_version_command() {
        let output = GitCommand::version().execute().await.unwrap();
        assert!(output.stdout.starts_with("git version"));
    }

    #[test]
    fn test_command_builder_with_dir() {
        let cmd = GitCommand::new().current_dir("/tmp/repo").arg("status");
        assert_eq!(cmd.full_args(), vec!["-C", "/tmp/repo", "status"]);
    }

    #[test]
    fn test_clone_builder() {
        let cmd = GitCommand::clone("https://example.com/repo.git", "/tmp/target");
        assert_eq!(cmd.args[0], "clone");
        assert!(cmd.args.contains(&"https://example.com/repo.git".to_string()));
        assert_eq!(cmd.clone_url.as_deref(), Some("https://example.com/repo.git"));
    }

    #[test]
    fn test_checkout_builder() {
        let cmd = GitCommand::checkout("v1.0.0");
        assert_eq!(cmd.args, vec!["checkout", "--quiet", "--detach", "v1.0.0"]);
    }

    #[test]
    fn test_terminal_prompt_disabled() {
        let cmd = GitCommand::new();
        assert!(cmd.env_vars.iter().any(|(k, v)| k == "GIT_TERMINAL_PROMPT" && v == "0"));
    }

    #[tokio::test]
    async fn test_clone_failure_maps_to_remote_fetch_failed() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("no-such-repo");
        let url = format!("file://{}", missing.display());
        let err = GitCommand::clone(&url, temp.path().join("target"))
            .execute()
            .await
            .unwrap_err();
        match err.downcast_ref::<XltError>() {
            Some(XltError::RemoteFetchFailed {
                url: failed,
                ..
            }) => assert_eq!(failed, &url),
            other => panic!("Expected RemoteFetchFailed, got {other:?}"),
        }
    }
}
