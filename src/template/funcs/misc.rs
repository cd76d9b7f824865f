//! Defaults, flow control, semantic versions, environment and identifiers.

use anyhow::{Context, Result, anyhow, bail};
use semver::{Version, VersionReq};
use serde_json::{Map, Value};

use super::{Arity, FunctionLibrary, string};
use crate::template::value::truthy;

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("default", Arity::Range(1, 2), |args| {
        Ok(match args.get(1) {
            Some(given) if truthy(given) => given.clone(),
            _ => args[0].clone(),
        })
    });
    lib.pure("empty", Arity::Exact(1), |args| Ok(Value::Bool(!truthy(&args[0]))));
    lib.pure("coalesce", Arity::AtLeast(0), |args| {
        Ok(args.iter().find(|a| truthy(a)).cloned().unwrap_or(Value::Null))
    });
    lib.pure("ternary", Arity::Exact(3), |args| {
        Ok(if truthy(&args[2]) { args[0].clone() } else { args[1].clone() })
    });
    lib.pure("fail", Arity::Exact(1), |args| Err(anyhow!(string(args, 0))));
    lib.pure("required", Arity::Exact(2), |args| match &args[1] {
        Value::Null => bail!(string(args, 0)),
        Value::String(s) if s.is_empty() => bail!(string(args, 0)),
        given => Ok(given.clone()),
    });

    lib.pure("semver", Arity::Exact(1), |args| semver_map(&string(args, 0)));
    lib.pure("semverCompare", Arity::Exact(2), |args| {
        Ok(Value::Bool(semver_matches(&string(args, 0), &string(args, 1))?))
    });

    lib.pure("env", Arity::Exact(1), |args| {
        Ok(Value::String(std::env::var(string(args, 0)).unwrap_or_default()))
    });
    lib.pure("expandenv", Arity::Exact(1), |args| {
        let input = string(args, 0);
        let expanded = shellexpand::env_with_context_no_errors(&input, |name| {
            Some(std::env::var(name).unwrap_or_default())
        });
        Ok(Value::String(expanded.into_owned()))
    });
    lib.pure("uuidv4", Arity::Exact(0), |_| Ok(Value::String(uuid::Uuid::new_v4().to_string())));
}

/// Parses a version leniently: a leading `v` is dropped and a missing minor
/// or patch number counts as zero, so `v1.2` is `1.2.0`.
fn coerce_version(text: &str) -> Result<Version> {
    let trimmed = text.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let split_at = bare.find(['-', '+']).unwrap_or(bare.len());
    let (core, suffix) = bare.split_at(split_at);

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        bail!("invalid semantic version {text:?}");
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{suffix}", parts.join("."))).with_context(|| format!("invalid semantic version {text:?}"))
}

fn semver_map(text: &str) -> Result<Value> {
    let version = coerce_version(text)?;
    let mut map = Map::new();
    map.insert("Major".into(), Value::from(version.major));
    map.insert("Minor".into(), Value::from(version.minor));
    map.insert("Patch".into(), Value::from(version.patch));
    map.insert("Prerelease".into(), Value::String(version.pre.to_string()));
    map.insert("Metadata".into(), Value::String(version.build.to_string()));
    map.insert("Original".into(), Value::String(text.to_string()));
    Ok(Value::Object(map))
}

/// Rewrites one `||` branch of a constraint into the comma separated form
/// `semver` expects: `>= 1.2 < 2` becomes `>=1.2, <2`, and a bare version
/// means exactly that version.
fn normalize_constraint(branch: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in branch.split([' ', ',']).filter(|t| !t.is_empty()) {
        if token.chars().all(|c| "<>=~^!".contains(c)) {
            pending_op.push_str(token);
            continue;
        }
        let op_len = token.find(|c: char| !"<>=~^!".contains(c)).unwrap_or(token.len());
        let (op, version) = token.split_at(op_len);
        let op = format!("{pending_op}{op}");
        pending_op.clear();

        let version = version.strip_prefix('v').unwrap_or(version);
        let wildcard = version.contains(['x', 'X', '*']);
        let op = if op.is_empty() && !wildcard { "=".to_string() } else { op };
        comparators.push(format!("{op}{version}"));
    }
    comparators.join(", ")
}

fn semver_matches(constraint: &str, version: &str) -> Result<bool> {
    let version = coerce_version(version)?;
    for branch in constraint.split("||") {
        let normalized = normalize_constraint(branch);
        let req = VersionReq::parse(&normalized)
            .with_context(|| format!("invalid version constraint {constraint:?}"))?;
        if req.matches(&version) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::funcs::test_support::{render, render_err, render_with};
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let data = json!({"set": "value", "zero": 0});
        assert_eq!(render_with(r#"{{ .missing | default "fallback" }} {{ .set | default "x" }} {{ default 5 .zero }}"#, data), "fallback value 5");
        assert_eq!(render(r#"{{ empty "" }} {{ empty (list 1) }} {{ coalesce 0 "" "first" "second" }}"#), "true false first");
        assert_eq!(render(r#"{{ ternary "yes" "no" true }} {{ false | ternary "yes" "no" }}"#), "yes no");
    }

    #[test]
    fn test_required_and_fail() {
        assert!(render_err(r#"{{ required "name is required" .name }}"#).contains("error calling required: name is required"));
        assert_eq!(render_with(r#"{{ required "x" .name }}"#, json!({"name": "n"})), "n");
        assert!(render_err(r#"{{ fail "stop here" }}"#).ends_with("stop here"));
    }

    #[test]
    fn test_semver() {
        assert_eq!(render(r#"{{ (semver "v1.2.3-rc.1+build5").Major }}.{{ (semver "1.2").Patch }} {{ (semver "1.2.3-rc.1").Prerelease }}"#), "1.0 rc.1");
        assert!(render_err(r#"{{ semver "not.a.version" }}"#).contains("invalid semantic version"));
    }

    #[test]
    fn test_semver_compare() {
        assert!(semver_matches(">= 1.2, < 2.0", "1.5.0").unwrap());
        assert!(semver_matches(">= 1.2 < 2.0", "v1.2").unwrap());
        assert!(!semver_matches("^1.2", "2.0.0").unwrap());
        assert!(semver_matches("~1.2 || ^3", "3.1.0").unwrap());
        assert!(semver_matches("1.2.3", "1.2.3").unwrap());
        assert!(!semver_matches("1.2.3", "1.2.4").unwrap());
        assert!(semver_matches("1.2.x", "1.2.9").unwrap());
        assert_eq!(render(r#"{{ semverCompare ">=1.0.0" "1.4.2" }}"#), "true");
    }

    #[test]
    #[serial]
    fn test_env_helpers() {
        unsafe {
            std::env::set_var("XLT_TEST_REGION", "eu-west");
            std::env::remove_var("XLT_TEST_UNSET");
        }
        assert_eq!(render(r#"{{ env "XLT_TEST_REGION" }}|{{ env "XLT_TEST_UNSET" }}"#), "eu-west|");
        assert_eq!(render(r#"{{ expandenv "r=${XLT_TEST_REGION} u=$XLT_TEST_UNSET" }}"#), "r=eu-west u=");
        unsafe {
            std::env::remove_var("XLT_TEST_REGION");
        }
    }

    #[test]
    fn test_uuidv4() {
        let id = render("{{ uuidv4 }}");
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_ne!(id, render("{{ uuidv4 }}"));
    }
}
