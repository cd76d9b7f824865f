//! Generic YAML configuration parsing.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::core::XltError;

/// Reads and deserializes a YAML configuration file.
///
/// An empty file deserializes like an empty mapping.
///
/// # Errors
///
/// - [`XltError::NotFound`] if the file does not exist
/// - [`XltError::ParseError`] if it is not valid YAML for `T`
pub fn parse_config<T>(path: &Path) -> Result<T, XltError>
where
    T: DeserializeOwned + Default,
{
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => XltError::NotFound {
            path: path.display().to_string(),
        },
        _ => XltError::IoError(e),
    })?;

    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_yaml::from_str(&content).map_err(|e| XltError::ParseError {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(serde::Deserialize, Default, Debug)]
    struct TestConfig {
        name: String,
        value: i32,
    }

    #[test]
    fn test_parse_config() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("test.yaml");
        std::fs::write(&config_path, "name: test\nvalue: 42\n").unwrap();

        let config: TestConfig = parse_config(&config_path).unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.value, 42);
    }

    #[test]
    fn test_parse_empty_config() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("empty.yaml");
        std::fs::write(&config_path, "\n").unwrap();

        let config: TestConfig = parse_config(&config_path).unwrap();
        assert_eq!(config.value, 0);
    }

    #[test]
    fn test_parse_config_errors() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("invalid.yaml");
        std::fs::write(&config_path, "name: [unclosed").unwrap();

        let result: Result<TestConfig, _> = parse_config(&config_path);
        assert!(matches!(result, Err(XltError::ParseError { .. })));

        let result: Result<TestConfig, _> = parse_config(&temp.path().join("missing.yaml"));
        assert!(matches!(result, Err(XltError::NotFound { .. })));
    }
}
