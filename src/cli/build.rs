//! Render a template to stdout or a file.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

use super::CliConfig;
use crate::config::{BuildConfig, BuildFile};
use crate::render::{RenderResult, Renderer};
use crate::utils::fs::atomic_write;

#[derive(Args, Debug)]
pub struct BuildCommand {
    /// YAML build file; flags override its values
    build_file: Option<PathBuf>,

    /// Main template: a local file or a file inside a git repository
    #[arg(long, env = "XLTEMPLATE_SOURCE")]
    source: Option<String>,

    /// YAML variables file
    #[arg(long, env = "XLTEMPLATE_VARIABLES")]
    variables: Option<PathBuf>,

    /// Directory of patterns, scanned recursively (repeatable)
    #[arg(long = "patterns", value_name = "PATTERNS")]
    patterns: Vec<String>,

    /// Write the result here instead of stdout
    #[arg(short, long, env = "XLTEMPLATE_OUTPUT")]
    output: Option<PathBuf>,
}

impl BuildCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let file = match &self.build_file {
            Some(path) => Some(BuildFile::load(path)?),
            None => None,
        };
        let flags = BuildFile {
            source: self.source,
            variables: self.variables,
            patterns: self.patterns,
            output: self.output,
        };
        let build = BuildConfig::merge(flags, file)?;

        let result = Renderer::new().render(&build.options).await?;
        if !config.quiet {
            report_warnings(&result);
        }

        match &build.output {
            Some(path) => {
                atomic_write(path, &result.text)?;
                tracing::info!("Wrote {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(result.text.as_bytes()).context("Failed to write to stdout")?;
                stdout.flush().context("Failed to write to stdout")?;
            }
        }
        Ok(())
    }
}

fn report_warnings(result: &RenderResult) {
    for warning in &result.warnings {
        eprintln!("{}: {}", "warning".yellow().bold(), warning);
    }
}
