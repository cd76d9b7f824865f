//! The end-to-end render pipeline.
//!
//! One call to [`Renderer::render`] resolves the source and every pattern
//! root, loads the variables, compiles all templates into one
//! [`Registry`], executes the main template and scans the output. Nothing is
//! shared between calls. Remote checkouts opened along the way are removed
//! before `render` returns, whether it succeeds or fails.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use crate::core::XltError;
use crate::patterns::{self, SkippedEntry};
use crate::scanner::{self, UnresolvedReference};
use crate::source::{FileLoader, SourceResolver};
use crate::template::{Registry, TemplateSource};
use crate::variables::{self, VariableSet};

/// Inputs of one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Source string of the main template, local or remote
    pub source: String,
    /// Optional YAML variables file
    pub variables: Option<PathBuf>,
    /// Pattern roots, local or remote, in registration order
    pub patterns: Vec<String>,
}

/// Output of a successful render.
#[derive(Debug, Default)]
pub struct RenderResult {
    pub text: String,
    /// Lines of `text` containing unresolved references
    pub warnings: Vec<UnresolvedReference>,
    /// Pattern entries that could not be read
    pub skipped_patterns: Vec<SkippedEntry>,
    /// Include problems that were recovered from
    pub include_issues: Vec<XltError>,
}

/// Runs the render pipeline.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    resolver: SourceResolver,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_resolver(SourceResolver::new())
    }

    pub fn with_resolver(resolver: SourceResolver) -> Self {
        Self {
            resolver,
        }
    }

    /// Renders `options.source` with the given variables and patterns.
    ///
    /// # Errors
    ///
    /// Any failure of the source, a pattern root, the primary variables file,
    /// compilation or execution. Unresolved references and problems with
    /// individual includes or pattern entries are not errors; they are
    /// reported in the [`RenderResult`].
    pub async fn render(&self, options: &BuildOptions) -> Result<RenderResult> {
        let mut loaders = Vec::with_capacity(options.patterns.len() + 1);
        let result = self.render_with(options, &mut loaders).await;

        for loader in loaders {
            if let Err(e) = loader.cleanup() {
                tracing::warn!("Failed to remove checkout: {:#}", e);
            }
        }
        result
    }

    async fn render_with(&self, options: &BuildOptions, loaders: &mut Vec<FileLoader>) -> Result<RenderResult> {
        tracing::debug!("Resolving source {}", options.source);
        let source_loader = self
            .resolver
            .resolve_str(&options.source)
            .await
            .with_context(|| format!("Failed to resolve source '{}'", options.source))?;
        loaders.push(source_loader);
        let main_text = loaders[loaders.len() - 1].load_target()?;
        let main = TemplateSource::new(options.source.clone(), main_text);

        let mut pattern_sources = Vec::new();
        let mut skipped_patterns = Vec::new();
        for pattern in &options.patterns {
            tracing::debug!("Resolving pattern root {}", pattern);
            let loader = self
                .resolver
                .resolve_str(pattern)
                .await
                .with_context(|| format!("Failed to resolve patterns '{pattern}'"))?;
            let collected = patterns::collect(&loader);
            loaders.push(loader);
            let (sources, skipped) = collected?;
            pattern_sources.extend(sources);
            skipped_patterns.extend(skipped);
        }

        let (data, include_issues) = match &options.variables {
            Some(path) => {
                tracing::debug!("Loading variables from {}", path.display());
                let loaded = variables::load_with_includes(path)?;
                (loaded.values, loaded.issues)
            }
            None => (VariableSet::new(), Vec::new()),
        };

        let registry = Registry::compile(&main, &pattern_sources).map_err(XltError::from)?;
        let text = registry.execute(&main.name, &Value::Object(data)).map_err(XltError::from)?;

        let warnings = scanner::scan(&text);
        tracing::debug!("Rendered {} bytes with {} unresolved references", text.len(), warnings.len());

        Ok(RenderResult {
            text,
            warnings,
            skipped_patterns,
            include_issues,
        })
    }
}
