//! Variable documents: YAML loading, key normalization and includes.
//!
//! A variables file is a YAML mapping. Its optional reserved key
//! [`INCLUDES_KEY`] lists further YAML files whose values fill in whatever
//! the primary document leaves unset:
//!
//! ```yaml
//! :includes:
//!   - env/prod.yaml
//!   - defaults.yaml
//! name: checkout-service
//! ```
//!
//! Precedence is primary document, then earlier includes, then later ones.
//! Include paths are used as written, so relative entries are relative to
//! the working directory. Included documents are not searched for includes
//! of their own.
//!
//! Everything is converted to [`serde_json::Value`] on load. Mapping keys
//! that YAML decodes as numbers or booleans become their string form; keys
//! that have no string form (null, sequences, mappings) are a
//! [`XltError::ParseError`].

use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;
use std::path::Path;

use crate::constants::INCLUDES_KEY;
use crate::core::XltError;

/// A normalized variables mapping.
pub type VariableSet = Map<String, Value>;

/// The result of [`load_with_includes`].
#[derive(Debug, Default)]
pub struct LoadedVariables {
    /// Merged values, never containing [`INCLUDES_KEY`]
    pub values: VariableSet,
    /// Problems with individual includes; each affected include was skipped
    pub issues: Vec<XltError>,
}

/// Loads one YAML document and normalizes its keys.
///
/// # Errors
///
/// - [`XltError::NotFound`] if the file does not exist
/// - [`XltError::ParseError`] for malformed YAML, a top level that is not a
///   mapping, or a key without a string form
pub fn load(path: &Path) -> Result<VariableSet, XltError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => XltError::NotFound {
            path: path.display().to_string(),
        },
        _ => XltError::IoError(e),
    })?;
    parse_document(&text, &path.display().to_string())
}

/// Parses YAML text into a normalized mapping.
///
/// An empty document is an empty mapping.
pub fn parse_document(text: &str, file: &str) -> Result<VariableSet, XltError> {
    let parse_error = |reason: String| XltError::ParseError {
        file: file.to_string(),
        reason,
    };

    let raw: YamlValue = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    match normalize(raw).map_err(parse_error)? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(parse_error(format!(
            "top level must be a mapping, found {}",
            kind_name(&other)
        ))),
    }
}

/// Converts a YAML value to a JSON value with string keys at every depth.
pub fn normalize(value: YamlValue) -> Result<Value, String> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => yaml_number(&n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => {
            Value::Array(items.into_iter().map(normalize).collect::<Result<_, _>>()?)
        }
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(key_to_string(key)?, normalize(value)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => normalize(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        // .inf and .nan have no JSON number form
        n.as_f64()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(n.to_string()), Value::Number)
    }
}

fn key_to_string(key: YamlValue) -> Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        YamlValue::Null => Err("mapping key 'null' cannot be converted to a string".to_string()),
        YamlValue::Sequence(_) => {
            Err("a sequence used as a mapping key cannot be converted to a string".to_string())
        }
        YamlValue::Mapping(_) => {
            Err("a mapping used as a mapping key cannot be converted to a string".to_string())
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Loads a variables file and merges its includes.
///
/// Failures of the primary document are returned as errors. Problems with
/// the includes are collected in [`LoadedVariables::issues`] and logged; the
/// affected include contributes nothing and the others still merge.
pub fn load_with_includes(path: &Path) -> Result<LoadedVariables, XltError> {
    let mut values = load(path)?;
    let mut issues = Vec::new();
    let file = path.display().to_string();

    let Some(includes) = values.remove(INCLUDES_KEY) else {
        return Ok(LoadedVariables {
            values,
            issues,
        });
    };
    tracing::debug!("Includes found in {}: {}", file, includes);

    let entries = match includes {
        Value::Array(entries) => entries,
        Value::Null => Vec::new(),
        other => {
            let issue = XltError::MergeError {
                file: file.clone(),
                reason: format!("'{INCLUDES_KEY}' must be a list, found {}", kind_name(&other)),
            };
            tracing::warn!("{}", issue);
            issues.push(issue);
            Vec::new()
        }
    };

    for entry in entries {
        let include = match entry {
            Value::String(include) => include,
            other => {
                let issue = XltError::MergeError {
                    file: file.clone(),
                    reason: format!("include entries must be strings, found {}", kind_name(&other)),
                };
                tracing::warn!("{}", issue);
                issues.push(issue);
                continue;
            }
        };

        match load(Path::new(&include)) {
            Ok(mut included) => {
                if included.remove(INCLUDES_KEY).is_some() {
                    tracing::debug!("Ignoring nested includes in {}", include);
                }
                merge_missing(&mut values, included);
            }
            Err(e) => {
                tracing::warn!("Skipping include {}: {}", include, e);
                issues.push(e);
            }
        }
    }

    let merged = Value::Object(values.clone());
    tracing::debug!("Merged variables: {}", merged);
    Ok(LoadedVariables {
        values,
        issues,
    })
}

/// Deep-merges `src` into `dst` without overwriting values `dst` already has.
///
/// Keys missing from `dst` are added. Keys whose `dst` value is empty (null,
/// `false`, `0`, `""`, an empty sequence or mapping) take the `src` value.
/// When both sides hold mappings the merge recurses.
pub fn merge_missing(dst: &mut VariableSet, src: VariableSet) {
    for (key, src_value) in src {
        match dst.get_mut(&key) {
            None => {
                dst.insert(key, src_value);
            }
            Some(dst_value) => match (dst_value, src_value) {
                (Value::Object(dst_map), Value::Object(src_map)) => merge_missing(dst_map, src_map),
                (dst_value, src_value) => {
                    if is_empty(dst_value) {
                        *dst_value = src_value;
                    }
                }
            },
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn includes_doc(paths: &[&PathBuf], extra: &str) -> String {
        let mut doc = String::from(":includes:\n");
        for path in paths {
            doc.push_str(&format!("  - \"{}\"\n", path.display()));
        }
        doc.push_str(extra);
        doc
    }

    #[test]
    fn test_load_simple_document() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "vars.yaml", "name: Ada\ncount: 3\nratio: 0.5\ntags: [a, b]\n");
        let values = load(&path).unwrap();
        assert_eq!(
            Value::Object(values),
            json!({"name": "Ada", "count": 3, "ratio": 0.5, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        assert!(parse_document("", "empty.yaml").unwrap().is_empty());
        assert!(parse_document("# only a comment\n", "empty.yaml").unwrap().is_empty());
    }

    #[test]
    fn test_non_string_keys_normalized_at_every_depth() {
        let doc = "1: one\ntrue: yes\nnested:\n  2.5: x\n  list:\n    - 10: ten\n      false: no\n";
        let values = parse_document(doc, "keys.yaml").unwrap();
        assert_eq!(
            Value::Object(values),
            json!({
                "1": "one",
                "true": "yes",
                "nested": {"2.5": "x", "list": [{"10": "ten", "false": "no"}]}
            })
        );
    }

    #[test]
    fn test_unconvertible_key_is_parse_error() {
        let err = parse_document("? [a, b]\n: value\n", "bad.yaml").unwrap_err();
        assert!(matches!(err, XltError::ParseError { .. }));

        let err = parse_document("~: value\n", "bad.yaml").unwrap_err();
        assert!(matches!(err, XltError::ParseError { .. }));
    }

    #[test]
    fn test_malformed_yaml_and_non_mapping() {
        assert!(matches!(
            parse_document("a: [unclosed", "bad.yaml"),
            Err(XltError::ParseError { .. })
        ));
        assert!(matches!(parse_document("- a\n- b\n", "list.yaml"), Err(XltError::ParseError { .. })));
    }

    #[test]
    fn test_tagged_values_unwrapped() {
        let values = parse_document("db: !secret\n  port: 5432\n", "tags.yaml").unwrap();
        assert_eq!(values["db"], json!({"port": 5432}));
    }

    #[test]
    fn test_missing_file() {
        let err = load(Path::new("/definitely/missing/vars.yaml")).unwrap_err();
        assert!(matches!(err, XltError::NotFound { .. }));
    }

    #[test]
    fn test_first_include_wins_when_primary_lacks_key() {
        let dir = TempDir::new().unwrap();
        let eu = write(&dir, "eu.yaml", "region: eu\n");
        let us = write(&dir, "us.yaml", "region: us\nzone: b\n");
        let main = write(&dir, "main.yaml", &includes_doc(&[&eu, &us], ""));

        let loaded = load_with_includes(&main).unwrap();
        assert!(loaded.issues.is_empty());
        assert_eq!(loaded.values["region"], json!("eu"));
        assert_eq!(loaded.values["zone"], json!("b"));
    }

    #[test]
    fn test_primary_wins_over_includes() {
        let dir = TempDir::new().unwrap();
        let eu = write(&dir, "eu.yaml", "region: eu\ndb:\n  host: shared\n  port: 5432\n");
        let main = write(&dir, "main.yaml", &includes_doc(&[&eu], "region: local\ndb:\n  host: primary\n"));

        let loaded = load_with_includes(&main).unwrap();
        assert_eq!(loaded.values["region"], json!("local"));
        assert_eq!(loaded.values["db"], json!({"host": "primary", "port": 5432}));
    }

    #[test]
    fn test_includes_key_always_removed() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.yaml", ":includes: []\nname: x\n");
        let loaded = load_with_includes(&main).unwrap();
        assert!(!loaded.values.contains_key(INCLUDES_KEY));

        let plain = write(&dir, "plain.yaml", "name: x\n");
        assert!(!load_with_includes(&plain).unwrap().values.contains_key(INCLUDES_KEY));
    }

    #[test]
    fn test_includes_not_a_list_is_reported() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.yaml", ":includes: other.yaml\nname: x\n");

        let loaded = load_with_includes(&main).unwrap();
        assert_eq!(Value::Object(loaded.values), json!({"name": "x"}));
        assert_eq!(loaded.issues.len(), 1);
        assert!(matches!(loaded.issues[0], XltError::MergeError { .. }));
    }

    #[test]
    fn test_bad_include_skipped_others_merge() {
        let dir = TempDir::new().unwrap();
        let broken = write(&dir, "broken.yaml", "a: [unclosed\n");
        let missing = dir.path().join("missing.yaml");
        let good = write(&dir, "good.yaml", "region: eu\n");
        let main = write(&dir, "main.yaml", &includes_doc(&[&broken, &missing, &good], "  - 42\n"));

        let loaded = load_with_includes(&main).unwrap();
        assert_eq!(loaded.values["region"], json!("eu"));
        assert_eq!(loaded.issues.len(), 3);
        assert!(matches!(loaded.issues[0], XltError::ParseError { .. }));
        assert!(matches!(loaded.issues[1], XltError::NotFound { .. }));
        assert!(matches!(loaded.issues[2], XltError::MergeError { .. }));
    }

    #[test]
    fn test_nested_includes_not_followed() {
        let dir = TempDir::new().unwrap();
        let deep = write(&dir, "deep.yaml", "deep: true\n");
        let middle = write(&dir, "middle.yaml", &includes_doc(&[&deep], "middle: true\n"));
        let main = write(&dir, "main.yaml", &includes_doc(&[&middle], ""));

        let loaded = load_with_includes(&main).unwrap();
        assert_eq!(Value::Object(loaded.values), json!({"middle": true}));
    }

    #[test]
    fn test_merge_fills_empty_values() {
        let mut dst = json!({"name": "", "count": 0, "enabled": false, "list": [], "keep": "x"})
            .as_object()
            .cloned()
            .unwrap();
        let src = json!({"name": "n", "count": 2, "enabled": true, "list": [1], "keep": "y"})
            .as_object()
            .cloned()
            .unwrap();
        merge_missing(&mut dst, src);
        assert_eq!(
            Value::Object(dst),
            json!({"name": "n", "count": 2, "enabled": true, "list": [1], "keep": "x"})
        );
    }
}
