//! Encodings, hashes and document conversions.

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{Arity, FunctionLibrary, string};
use crate::variables;

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("b64enc", Arity::Exact(1), |args| Ok(Value::String(STANDARD.encode(string(args, 0)))));
    lib.pure("b64dec", Arity::Exact(1), |args| {
        let bytes = STANDARD.decode(string(args, 0).trim()).context("invalid base64 input")?;
        Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    });
    lib.pure("sha256sum", Arity::Exact(1), |args| {
        Ok(Value::String(hex::encode(Sha256::digest(string(args, 0).as_bytes()))))
    });

    lib.pure("toJson", Arity::Exact(1), |args| Ok(Value::String(serde_json::to_string(&args[0])?)));
    lib.pure("toPrettyJson", Arity::Exact(1), |args| {
        Ok(Value::String(serde_json::to_string_pretty(&args[0])?))
    });
    lib.pure("fromJson", Arity::Exact(1), |args| {
        serde_json::from_str(&string(args, 0)).context("invalid JSON input")
    });
    lib.pure("toYaml", Arity::Exact(1), |args| {
        let yaml = serde_yaml::to_string(&args[0])?;
        Ok(Value::String(yaml.strip_suffix('\n').unwrap_or(&yaml).to_string()))
    });
    lib.pure("fromYaml", Arity::Exact(1), |args| {
        let raw: serde_yaml::Value = serde_yaml::from_str(&string(args, 0)).context("invalid YAML input")?;
        variables::normalize(raw).map_err(anyhow::Error::msg)
    });
}

#[cfg(test)]
mod tests {
    use crate::template::funcs::test_support::{render, render_err, render_with};
    use serde_json::json;

    #[test]
    fn test_base64_and_hash() {
        assert_eq!(render(r#"{{ b64enc "hello" }} {{ "aGVsbG8=" | b64dec }}"#), "aGVsbG8= hello");
        assert!(render_err(r#"{{ b64dec "%%%" }}"#).contains("invalid base64"));
        assert_eq!(
            render(r#"{{ sha256sum "abc" }}"#),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_json() {
        let data = json!({"svc": {"name": "api", "ports": [80]}});
        assert_eq!(render_with("{{ toJson .svc }}", data.clone()), r#"{"name":"api","ports":[80]}"#);
        assert_eq!(render_with("{{ toPrettyJson .svc.ports }}", data), "[\n  80\n]");
        assert_eq!(render(r#"{{ (fromJson "{\"a\": {\"b\": 2}}").a.b }}"#), "2");
    }

    #[test]
    fn test_yaml() {
        let data = json!({"svc": {"name": "api", "replicas": 2}});
        assert_eq!(render_with("{{ toYaml .svc }}", data), "name: api\nreplicas: 2");
        assert_eq!(render(r#"{{ (fromYaml "a:\n  1: one").a }}"#), "map[1:one]");
    }
}
