//! Dictionary helpers.
//!
//! Values are immutable inside a render: `set`, `unset` and the merges
//! return the updated dictionary rather than changing the one passed in,
//! so the result has to be kept (`{{ $d = set $d "k" "v" }}`).

use anyhow::{Result, bail};
use serde_json::{Map, Value};

use super::{Arity, FunctionLibrary, dict};
use crate::template::value::{self, truthy};
use crate::variables::merge_missing;

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("dict", Arity::AtLeast(0), |args| {
        let mut map = Map::new();
        for pair in args.chunks(2) {
            let value = pair.get(1).cloned().unwrap_or_else(|| Value::String(String::new()));
            map.insert(value::to_str(&pair[0]), value);
        }
        Ok(Value::Object(map))
    });
    lib.pure("get", Arity::Exact(2), |args| {
        let map = dict(&args[0], "get")?;
        Ok(map.get(&value::to_str(&args[1])).cloned().unwrap_or_else(|| Value::String(String::new())))
    });
    lib.pure("set", Arity::Exact(3), |args| {
        let mut map = dict(&args[0], "set")?.clone();
        map.insert(value::to_str(&args[1]), args[2].clone());
        Ok(Value::Object(map))
    });
    lib.pure("unset", Arity::Exact(2), |args| {
        let mut map = dict(&args[0], "unset")?.clone();
        map.remove(&value::to_str(&args[1]));
        Ok(Value::Object(map))
    });
    lib.pure("hasKey", Arity::Exact(2), |args| {
        Ok(Value::Bool(dict(&args[0], "hasKey")?.contains_key(&value::to_str(&args[1]))))
    });
    lib.pure("pluck", Arity::AtLeast(1), |args| {
        let key = value::to_str(&args[0]);
        let mut found = Vec::new();
        for arg in &args[1..] {
            if let Some(v) = dict(arg, "pluck")?.get(&key) {
                found.push(v.clone());
            }
        }
        Ok(Value::Array(found))
    });
    lib.pure("keys", Arity::AtLeast(1), |args| {
        let mut keys = Vec::new();
        for arg in args {
            keys.extend(dict(arg, "keys")?.keys().cloned().map(Value::String));
        }
        Ok(Value::Array(keys))
    });
    lib.pure("values", Arity::Exact(1), |args| {
        Ok(Value::Array(dict(&args[0], "values")?.values().cloned().collect()))
    });
    lib.pure("pick", Arity::AtLeast(1), |args| {
        let wanted: Vec<String> = args[1..].iter().map(value::to_str).collect();
        let map = dict(&args[0], "pick")?;
        Ok(Value::Object(map.iter().filter(|(k, _)| wanted.contains(k)).map(|(k, v)| (k.clone(), v.clone())).collect()))
    });
    lib.pure("omit", Arity::AtLeast(1), |args| {
        let unwanted: Vec<String> = args[1..].iter().map(value::to_str).collect();
        let map = dict(&args[0], "omit")?;
        Ok(Value::Object(map.iter().filter(|(k, _)| !unwanted.contains(k)).map(|(k, v)| (k.clone(), v.clone())).collect()))
    });
    lib.pure("merge", Arity::AtLeast(1), |args| {
        let mut merged = dict(&args[0], "merge")?.clone();
        for src in &args[1..] {
            merge_missing(&mut merged, dict(src, "merge")?.clone());
        }
        Ok(Value::Object(merged))
    });
    lib.pure("mergeOverwrite", Arity::AtLeast(1), |args| {
        let mut merged = dict(&args[0], "mergeOverwrite")?.clone();
        for src in &args[1..] {
            merge_overwrite(&mut merged, dict(src, "mergeOverwrite")?);
        }
        Ok(Value::Object(merged))
    });
    lib.pure("dig", Arity::AtLeast(3), dig);
}

/// Deep merge where non-empty source values replace destination values.
fn merge_overwrite(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, src_value) in src {
        if let (Some(Value::Object(dst_map)), Value::Object(src_map)) = (dst.get_mut(key), src_value) {
            merge_overwrite(dst_map, src_map);
            continue;
        }
        if dst.contains_key(key) && !truthy(src_value) {
            continue;
        }
        dst.insert(key.clone(), src_value.clone());
    }
}

/// `dig "a" "b" DEFAULT DICT`: follows the keys, returning DEFAULT if any is missing.
fn dig(args: &[Value]) -> Result<Value> {
    let Some((map, rest)) = args.split_last() else {
        bail!("dig needs at least one key, a default and a dictionary");
    };
    let Some((default, keys)) = rest.split_last() else {
        bail!("dig needs at least one key, a default and a dictionary");
    };

    let mut current = map;
    for key in keys {
        let Value::Object(m) = current else {
            bail!("dig: cannot descend into {}", value::kind(current));
        };
        match m.get(&value::to_str(key)) {
            Some(next) => current = next,
            None => return Ok(default.clone()),
        }
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use crate::template::funcs::test_support::{render, render_with};
    use serde_json::json;

    #[test]
    fn test_dict_access() {
        let text = r#"{{ $d := dict "a" 1 "b" "two" }}{{ get $d "a" }} {{ get $d "zz" }}| {{ hasKey $d "b" }} {{ keys $d }} {{ values $d }}"#;
        assert_eq!(render(text), "1 | true [a b] [1 two]");
    }

    #[test]
    fn test_set_returns_updated_copy() {
        let text = r#"{{ $d := dict "a" 1 }}{{ $e := set $d "b" 2 }}{{ $d }} {{ $e }} {{ unset $e "a" }}"#;
        assert_eq!(render(text), "map[a:1] map[a:1 b:2] map[b:2]");
    }

    #[test]
    fn test_pick_omit_pluck() {
        let data = json!({"d": {"a": 1, "b": 2, "c": 3}, "e": {"a": 9}});
        assert_eq!(render_with(r#"{{ pick .d "a" "c" }} {{ omit .d "a" }} {{ pluck "a" .d .e }}"#, data), "map[a:1 c:3] map[b:2 c:3] [1 9]");
    }

    #[test]
    fn test_merges() {
        let data = json!({"dst": {"a": 1, "n": {"x": 1}, "empty": ""}, "src": {"a": 2, "b": 3, "n": {"y": 2}, "empty": "filled"}});
        assert_eq!(render_with("{{ merge .dst .src }}", data.clone()), "map[a:1 b:3 empty:filled n:map[x:1 y:2]]");
        assert_eq!(render_with("{{ mergeOverwrite .dst .src }}", data), "map[a:2 b:3 empty:filled n:map[x:1 y:2]]");
    }

    #[test]
    fn test_dig() {
        let data = json!({"cfg": {"db": {"host": "h"}}});
        assert_eq!(render_with(r#"{{ dig "db" "host" "none" .cfg }} {{ dig "db" "port" 5432 .cfg }}"#, data), "h 5432");
    }
}
