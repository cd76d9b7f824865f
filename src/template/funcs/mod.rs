//! The functions templates can call.
//!
//! The standard library combines Go's template builtins with a sprig-style
//! helper set. Every function receives its arguments already evaluated;
//! with a pipeline the piped value arrives as the last argument.
//!
//! Most functions are [`FuncKind::Pure`]. Functions that need to render
//! other templates, such as `include`, are [`FuncKind::Engine`] and get
//! the running [`Executor`].

mod builtin;
mod date;
mod dicts;
mod encoding;
mod lists;
mod math;
mod misc;
mod strings;

use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use super::exec::Executor;
use super::value::{self, Num};

pub type PureFn = fn(&[Value]) -> Result<Value>;
pub type EngineFn = fn(&mut Executor<'_>, &[Value]) -> Result<Value>;

#[derive(Clone, Copy)]
pub enum FuncKind {
    Pure(PureFn),
    Engine(EngineFn),
}

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, given: usize) -> bool {
        match self {
            Arity::Exact(n) => given == n,
            Arity::AtLeast(n) => given >= n,
            Arity::Range(min, max) => (min..=max).contains(&given),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

#[derive(Clone, Copy)]
pub struct FuncSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub kind: FuncKind,
}

/// Functions by name.
#[derive(Clone, Default)]
pub struct FunctionLibrary {
    funcs: HashMap<&'static str, FuncSpec>,
}

impl FunctionLibrary {
    /// A library with no functions at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builtins, the sprig-style helpers, and `include`.
    pub fn standard() -> Self {
        let mut lib = Self::empty();
        builtin::register(&mut lib);
        strings::register(&mut lib);
        lists::register(&mut lib);
        dicts::register(&mut lib);
        math::register(&mut lib);
        encoding::register(&mut lib);
        date::register(&mut lib);
        misc::register(&mut lib);
        lib
    }

    pub fn pure(&mut self, name: &'static str, arity: Arity, f: PureFn) {
        self.insert(FuncSpec {
            name,
            arity,
            kind: FuncKind::Pure(f),
        });
    }

    pub fn engine(&mut self, name: &'static str, arity: Arity, f: EngineFn) {
        self.insert(FuncSpec {
            name,
            arity,
            kind: FuncKind::Engine(f),
        });
    }

    pub fn insert(&mut self, spec: FuncSpec) {
        self.funcs.insert(spec.name, spec);
    }

    pub fn get(&self, name: &str) -> Option<&FuncSpec> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.funcs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

// Argument helpers shared by the function modules. Arity is checked by the
// executor before a function runs, so indexing into `args` is safe.

fn string(args: &[Value], i: usize) -> String {
    value::to_str(&args[i])
}

fn int(value: &Value) -> Result<i64> {
    Ok(match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(_) => match value::number(value) {
            Some(Num::Int(i)) => i,
            Some(Num::Float(f)) => f as i64,
            None => 0,
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => match s.parse::<f64>() {
                    Ok(f) => f as i64,
                    Err(_) => bail!("cannot convert {s:?} to an integer"),
                },
            }
        }
        other => bail!("cannot convert {} to an integer", value::kind(other)),
    })
}

fn float(value: &Value) -> Result<f64> {
    Ok(match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(_) => value::number(value).map_or(0.0, Num::as_f64),
        Value::String(s) => {
            s.trim().parse::<f64>().map_err(|_| anyhow::anyhow!("cannot convert {s:?} to a float"))?
        }
        other => bail!("cannot convert {} to a float", value::kind(other)),
    })
}

fn list<'v>(value: &'v Value, func: &str) -> Result<&'v [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        other => bail!("cannot {func} on type {}", value::kind(other)),
    }
}

fn dict<'v>(value: &'v Value, func: &str) -> Result<&'v Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("cannot {func} on type {}", value::kind(other)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::template::{Registry, TemplateSource};
    use serde_json::{Value, json};

    /// Renders `text` against `data`, panicking with the template on failure.
    pub fn render_with(text: &str, data: Value) -> String {
        let main = TemplateSource::new("f.tmpl", text);
        Registry::compile(&main, &[])
            .and_then(|registry| registry.execute("f.tmpl", &data))
            .unwrap_or_else(|e| panic!("{text}: {e}"))
    }

    pub fn render(text: &str) -> String {
        render_with(text, json!({}))
    }

    pub fn render_err(text: &str) -> String {
        let main = TemplateSource::new("f.tmpl", text);
        match Registry::compile(&main, &[]).and_then(|registry| registry.execute("f.tmpl", &json!({}))) {
            Ok(out) => panic!("{text} rendered {out:?}, expected an error"),
            Err(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_contents() {
        let lib = FunctionLibrary::standard();
        for name in ["and", "printf", "include", "default", "toYaml", "semverCompare", "regexMatch"] {
            assert!(lib.contains(name), "missing {name}");
        }
        assert!(matches!(lib.get("include").map(|f| f.kind), Some(FuncKind::Engine(_))));
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(Arity::Range(1, 2).accepts(1));
        assert!(!Arity::Range(1, 2).accepts(0));
        assert_eq!(Arity::AtLeast(1).to_string(), "at least 1");
    }

    #[test]
    fn test_int_conversion() {
        assert_eq!(int(&Value::from("42")).unwrap(), 42);
        assert_eq!(int(&Value::from(2.9)).unwrap(), 2);
        assert_eq!(int(&Value::Null).unwrap(), 0);
        assert!(int(&Value::from("abc")).is_err());
    }
}
