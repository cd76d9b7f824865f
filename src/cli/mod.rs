//! Command-line interface for xltemplate.
//!
//! ```bash
//! # Render to stdout
//! xltemplate build --source main.tmpl --variables vars.yaml --patterns patterns/
//!
//! # Render from a repository, writing to a file
//! xltemplate build \
//!     --source https://github.com/org/templates//release.tmpl?ref=v1.4.0 \
//!     --patterns https://github.com/org/templates//patterns?ref=v1.4.0 \
//!     --output release.yaml
//!
//! # Describe the build in a file
//! xltemplate build build.yaml
//!
//! xltemplate version
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` takes precedence; otherwise
//! `--verbose` enables debug output, `--quiet` limits it to errors and the
//! default shows warnings.

mod build;
mod version;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use build::BuildCommand;
pub use version::VersionCommand;

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter, used when `RUST_LOG` is not set
    pub log_level: &'static str,
    /// Suppress warnings on stderr
    pub quiet: bool,
}

impl CliConfig {
    /// Installs the global tracing subscriber, writing to stderr.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "xltemplate",
    about = "Render documents from a main template, reusable patterns and layered YAML variables",
    version,
    author,
    long_about = "xltemplate renders release and variable files from Go-style templates. \
                  Templates and pattern directories may be local paths or paths inside git repositories."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template
    Build(BuildCommand),

    /// Print the version
    Version(VersionCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Build(cmd) => cmd.execute(&config).await,
            Commands::Version(cmd) => cmd.execute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_from_flags() {
        let cli = Cli::parse_from(["xltemplate", "version"]);
        assert_eq!(cli.build_config().log_level, "warn");

        let cli = Cli::parse_from(["xltemplate", "-v", "version"]);
        assert_eq!(cli.build_config().log_level, "debug");

        let cli = Cli::parse_from(["xltemplate", "version", "--quiet"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, "error");
        assert!(config.quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["xltemplate", "-v", "-q", "version"]).is_err());
    }
}
