//! Build configuration for xltemplate
//!
//! A build can be described entirely by command-line flags, entirely by a
//! build file, or by both. A build file is a YAML mapping whose keys mirror
//! the `build` flags:
//!
//! ```yaml
//! source: templates/release.tmpl
//! variables: env/prod.yaml
//! patterns:
//!   - templates/patterns
//!   - https://github.com/org/shared-patterns//web?ref=v2.1.0
//! output: out/release.yaml
//! ```
//!
//! When both are given, a non-empty flag value wins over the file's value,
//! and pattern roots from the flags come before those from the file. Paths
//! are used as written, so relative paths are relative to the working
//! directory rather than to the build file.

pub mod parser;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::XltError;
use crate::render::BuildOptions;

pub use parser::parse_config;

/// Contents of a build file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildFile {
    pub source: Option<String>,
    pub variables: Option<PathBuf>,
    pub patterns: Vec<String>,
    pub output: Option<PathBuf>,
}

impl BuildFile {
    /// Loads a build file.
    ///
    /// # Errors
    ///
    /// [`XltError::NotFound`] or [`XltError::ParseError`] as for [`parse_config`].
    pub fn load(path: &Path) -> Result<Self, XltError> {
        let file: Self = parse_config(path)?;
        tracing::debug!("Loaded build file {}: {:?}", path.display(), file);
        Ok(file)
    }
}

/// A fully merged build: what to render and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub options: BuildOptions,
    /// Output file; standard output when `None`
    pub output: Option<PathBuf>,
}

impl BuildConfig {
    /// Merges flag values over an optional build file.
    ///
    /// `flags` carries the command-line values; its `patterns` are placed
    /// before the file's.
    ///
    /// # Errors
    ///
    /// [`XltError::Other`] if neither side names a source.
    pub fn merge(flags: BuildFile, file: Option<BuildFile>) -> Result<Self, XltError> {
        let file = file.unwrap_or_default();

        let source = pick(flags.source, file.source, |s| s.trim().is_empty()).ok_or_else(|| XltError::Other {
            message: "no source given: pass --source or set 'source' in the build file".to_string(),
        })?;
        let variables = pick(flags.variables, file.variables, |p| p.as_os_str().is_empty());
        let output = pick(flags.output, file.output, |p| p.as_os_str().is_empty());

        let mut patterns = flags.patterns;
        patterns.extend(file.patterns);
        patterns.retain(|p| !p.trim().is_empty());

        Ok(Self {
            options: BuildOptions {
                source,
                variables,
                patterns,
            },
            output,
        })
    }
}

/// The flag value unless it is absent or empty, then the file value on the same terms.
fn pick<T>(flag: Option<T>, file: Option<T>, is_empty: impl Fn(&T) -> bool) -> Option<T> {
    flag.filter(|v| !is_empty(v)).or_else(|| file.filter(|v| !is_empty(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_build_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("build.yaml");
        std::fs::write(
            &path,
            "source: main.tmpl\nvariables: vars.yaml\npatterns:\n  - patterns\noutput: out.yaml\n",
        )
        .unwrap();

        let file = BuildFile::load(&path).unwrap();
        assert_eq!(
            file,
            BuildFile {
                source: Some("main.tmpl".to_string()),
                variables: Some(PathBuf::from("vars.yaml")),
                patterns: vec!["patterns".to_string()],
                output: Some(PathBuf::from("out.yaml")),
            }
        );
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("build.yaml");
        std::fs::write(&path, "sources: main.tmpl\n").unwrap();
        assert!(matches!(BuildFile::load(&path), Err(XltError::ParseError { .. })));
    }

    #[test]
    fn test_flags_win_and_patterns_append() {
        let flags = BuildFile {
            source: Some("flag.tmpl".to_string()),
            variables: None,
            patterns: vec!["flag-patterns".to_string()],
            output: Some(PathBuf::new()),
        };
        let file = BuildFile {
            source: Some("file.tmpl".to_string()),
            variables: Some(PathBuf::from("file.yaml")),
            patterns: vec!["file-patterns".to_string()],
            output: Some(PathBuf::from("file.out")),
        };

        let config = BuildConfig::merge(flags, Some(file)).unwrap();
        assert_eq!(config.options.source, "flag.tmpl");
        assert_eq!(config.options.variables, Some(PathBuf::from("file.yaml")));
        assert_eq!(config.options.patterns, vec!["flag-patterns", "file-patterns"]);
        assert_eq!(config.output, Some(PathBuf::from("file.out")));
    }

    #[test]
    fn test_missing_source_is_error() {
        let flags = BuildFile {
            source: Some("  ".to_string()),
            ..BuildFile::default()
        };
        let err = BuildConfig::merge(flags, None).unwrap_err();
        assert!(err.to_string().contains("no source given"));
    }
}
