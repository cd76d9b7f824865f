//! Template engine: a Go `text/template` compatible language over JSON values.
//!
//! A [`Registry`] is built in two phases. First every template text is
//! compiled and registered under its name, together with the `define` and
//! `block` bodies it contains. Only then is anything executed, so any
//! template may refer to any other by name regardless of the order they were
//! added in, including mutually recursive references.
//!
//! ```rust
//! use serde_json::json;
//! use xltemplate::template::{Registry, TemplateSource};
//!
//! let main = TemplateSource::new("main.tmpl", r#"Hello {{.name}}, {{include "greeting" .}}"#);
//! let patterns = vec![TemplateSource::new("greeting.tmpl", "Hi from pattern")];
//! let registry = Registry::compile(&main, &patterns)?;
//! let text = registry.execute("main.tmpl", &json!({"name": "Ada"}))?;
//! assert_eq!(text, "Hello Ada, Hi from pattern");
//! # Ok::<(), xltemplate::template::TemplateError>(())
//! ```
//!
//! Name lookup is exact first. When no template has exactly the requested
//! name, a template whose file stem matches is used instead, so the pattern
//! `greeting.tmpl` is also reachable as `greeting`.

pub mod exec;
pub mod funcs;
pub mod lexer;
pub mod parse;
pub mod value;

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use strsim::levenshtein;
use thiserror::Error;

use crate::constants::TEMPLATE_STACK_SIZE;
use crate::core::XltError;
use exec::Executor;
use funcs::FunctionLibrary;
use parse::Node;

/// Largest edit distance, as a percentage of the requested name's length,
/// for a registered name to be suggested.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// A named template text, not yet compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub name: String,
    pub text: String,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Errors raised while compiling or executing templates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The text is not a valid template.
    #[error("template: {name}:{line}: {message}")]
    Syntax {
        name: String,
        line: usize,
        message: String,
    },

    /// Execution failed.
    #[error("template: {name}:{line}: {message}")]
    Exec {
        name: String,
        line: usize,
        message: String,
    },
}

impl From<TemplateError> for XltError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Syntax {
                ..
            } => XltError::CompileError {
                message: err.to_string(),
            },
            TemplateError::Exec {
                ..
            } => XltError::ExecutionError {
                message: err.to_string(),
            },
        }
    }
}

/// Compiled templates addressable by name, plus the functions they may call.
pub struct Registry {
    templates: HashMap<String, Vec<Node>>,
    library: FunctionLibrary,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("templates", &self.names()).finish_non_exhaustive()
    }
}

impl Registry {
    /// An empty registry with the standard function library.
    pub fn new() -> Self {
        Self::with_library(FunctionLibrary::standard())
    }

    pub fn with_library(library: FunctionLibrary) -> Self {
        Self {
            templates: HashMap::new(),
            library,
        }
    }

    /// Compiles a main template and its patterns into one registry.
    ///
    /// The main template is added first, then the patterns in order; a later
    /// registration under an existing name replaces the earlier one.
    pub fn compile(main: &TemplateSource, patterns: &[TemplateSource]) -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        registry.add(main)?;
        for pattern in patterns {
            registry.add(pattern)?;
        }
        tracing::debug!("Compiled {} templates", registry.templates.len());
        Ok(registry)
    }

    /// Compiles one template text and registers it and its definitions.
    pub fn add(&mut self, source: &TemplateSource) -> Result<(), TemplateError> {
        let pieces = lexer::lex(&source.name, &source.text)?;
        let functions: HashSet<&str> = self.library.names().collect();
        let parsed = parse::parse(&source.name, pieces, &functions)?;

        self.register(source.name.clone(), parsed.body);
        for (name, body) in parsed.defines {
            self.register(name, body);
        }
        Ok(())
    }

    fn register(&mut self, name: String, body: Vec<Node>) {
        if self.templates.contains_key(&name) {
            tracing::warn!("Template '{}' is defined more than once, last definition wins", name);
        }
        tracing::trace!("Registered template {}", name);
        self.templates.insert(name, body);
    }

    /// Whether `name` resolves to a template, exactly or by stem.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Finds a template body by exact name, falling back to a file stem match.
    pub(crate) fn resolve(&self, name: &str) -> Option<(&str, &[Node])> {
        if let Some((key, body)) = self.templates.get_key_value(name) {
            return Some((key.as_str(), body.as_slice()));
        }
        self.templates
            .iter()
            .filter(|(key, _)| {
                Path::new(key.as_str()).file_stem().is_some_and(|stem| stem == name)
            })
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(key, body)| (key.as_str(), body.as_slice()))
    }

    /// Up to three registered names close to `name`, closest first.
    pub fn similar_names(&self, name: &str) -> Vec<&str> {
        let mut scored: Vec<(&str, usize)> = self
            .templates
            .keys()
            .map(|key| {
                let stem = Path::new(key.as_str()).file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
                let distance = levenshtein(name, key).min(levenshtein(name, &stem));
                (key.as_str(), distance)
            })
            .filter(|(_, distance)| *distance <= name.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .collect();
        scored.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));
        scored.into_iter().take(3).map(|(key, _)| key).collect()
    }

    pub(crate) fn library(&self) -> &FunctionLibrary {
        &self.library
    }

    /// Executes the template registered under `name` with `data` as dot.
    ///
    /// Runs on a dedicated thread with a large stack so that recursion bounded
    /// by the data can go deep without overflowing.
    pub fn execute(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        std::thread::scope(|scope| {
            let handle = std::thread::Builder::new()
                .name("template-exec".to_string())
                .stack_size(TEMPLATE_STACK_SIZE)
                .spawn_scoped(scope, || Executor::new(self).run_template(name, data))
                .map_err(|e| TemplateError::Exec {
                    name: name.to_string(),
                    line: 0,
                    message: format!("cannot start template execution: {e}"),
                })?;
            handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }
}
