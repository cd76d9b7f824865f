//! Go template builtins and `include`.

use anyhow::{Result, bail};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Write;

use super::{Arity, FunctionLibrary, int, string};
use crate::template::exec::Executor;
use crate::template::value::{self, truthy};

pub(super) fn register(lib: &mut FunctionLibrary) {
    // The executor short-circuits these; the bodies only see fully evaluated args
    lib.pure("and", Arity::AtLeast(1), |args| {
        Ok(args.iter().find(|a| !truthy(a)).unwrap_or(&args[args.len() - 1]).clone())
    });
    lib.pure("or", Arity::AtLeast(1), |args| {
        Ok(args.iter().find(|a| truthy(a)).unwrap_or(&args[args.len() - 1]).clone())
    });
    lib.pure("not", Arity::Exact(1), |args| Ok(Value::Bool(!truthy(&args[0]))));
    lib.pure("len", Arity::Exact(1), len);
    lib.pure("index", Arity::AtLeast(1), index);
    lib.pure("slice", Arity::Range(1, 3), slice);

    lib.pure("eq", Arity::AtLeast(2), eq);
    lib.pure("ne", Arity::Exact(2), |args| {
        Ok(Value::Bool(!value::equal(&args[0], &args[1]).map_err(anyhow::Error::msg)?))
    });
    lib.pure("lt", Arity::Exact(2), |args| ordered(args, |o| o == Ordering::Less));
    lib.pure("le", Arity::Exact(2), |args| ordered(args, |o| o != Ordering::Greater));
    lib.pure("gt", Arity::Exact(2), |args| ordered(args, |o| o == Ordering::Greater));
    lib.pure("ge", Arity::Exact(2), |args| ordered(args, |o| o != Ordering::Less));

    lib.pure("print", Arity::AtLeast(0), |args| Ok(Value::String(value::sprint(args))));
    lib.pure("println", Arity::AtLeast(0), |args| Ok(Value::String(value::sprintln(args))));
    lib.pure("printf", Arity::AtLeast(1), |args| {
        Ok(Value::String(value::sprintf(&string(args, 0), &args[1..])))
    });

    lib.pure("html", Arity::AtLeast(1), |args| Ok(Value::String(html_escape(&joined(args)))));
    lib.pure("js", Arity::AtLeast(1), |args| Ok(Value::String(js_escape(&joined(args)))));
    lib.pure("urlquery", Arity::AtLeast(1), |args| Ok(Value::String(query_escape(&joined(args)))));

    lib.engine("include", Arity::Exact(2), include);
}

fn include(executor: &mut Executor<'_>, args: &[Value]) -> Result<Value> {
    let Value::String(name) = &args[0] else {
        bail!("template name must be a string, got {}", value::kind(&args[0]));
    };
    Ok(Value::String(executor.include(name, &args[1])?))
}

fn joined(args: &[Value]) -> String {
    match args {
        [Value::String(s)] => s.clone(),
        _ => value::sprint(args),
    }
}

fn len(args: &[Value]) -> Result<Value> {
    let n = match &args[0] {
        Value::String(s) => s.len(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => bail!("len of type {}", value::kind(other)),
    };
    Ok(Value::from(n))
}

/// A slice bound in `0..=len`.
fn position(index: &Value, len: usize) -> Result<usize> {
    let i = int(index)?;
    match usize::try_from(i) {
        Ok(i) if i <= len => Ok(i),
        _ => bail!("index out of range: {i}"),
    }
}

fn index(args: &[Value]) -> Result<Value> {
    let mut current = args[0].clone();
    for key in &args[1..] {
        current = match current {
            Value::Array(mut items) => {
                let i = int(key)?;
                match usize::try_from(i) {
                    Ok(i) if i < items.len() => items.swap_remove(i),
                    _ => bail!("index out of range: {i}"),
                }
            }
            Value::Object(mut map) => match key {
                Value::String(k) => map.remove(k).unwrap_or(Value::Null),
                other => bail!("cannot index map with {}", value::kind(other)),
            },
            Value::String(s) => {
                let i = int(key)?;
                match usize::try_from(i).ok().and_then(|i| s.as_bytes().get(i)) {
                    Some(b) => Value::from(*b),
                    None => bail!("index out of range: {i}"),
                }
            }
            Value::Null => bail!("index of untyped nil"),
            other => bail!("can't index item of type {}", value::kind(&other)),
        };
    }
    Ok(current)
}

fn slice(args: &[Value]) -> Result<Value> {
    let bounds = &args[1..];
    match &args[0] {
        Value::String(s) => {
            if bounds.len() > 2 {
                bail!("cannot 3-index slice a string");
            }
            let start = bounds.first().map(|b| position(b, s.len())).transpose()?.unwrap_or(0);
            let end = bounds.get(1).map(|b| position(b, s.len())).transpose()?.unwrap_or(s.len());
            if start > end {
                bail!("invalid slice index: {start} > {end}");
            }
            match s.get(start..end) {
                Some(part) => Ok(Value::String(part.to_string())),
                None => bail!("slice {start}:{end} splits a character"),
            }
        }
        Value::Array(items) => {
            let n = items.len();
            let start = bounds.first().map(|b| position(b, n)).transpose()?.unwrap_or(0);
            let end = bounds.get(1).map(|b| position(b, n)).transpose()?.unwrap_or(n);
            if let Some(cap) = bounds.get(2) {
                let cap = position(cap, n)?;
                if end > cap {
                    bail!("invalid slice index: {end} > {cap}");
                }
            }
            if start > end {
                bail!("invalid slice index: {start} > {end}");
            }
            Ok(Value::Array(items[start..end].to_vec()))
        }
        Value::Null => bail!("slice of untyped nil"),
        other => bail!("can't slice item of type {}", value::kind(other)),
    }
}

fn eq(args: &[Value]) -> Result<Value> {
    for other in &args[1..] {
        if value::equal(&args[0], other).map_err(anyhow::Error::msg)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ordered(args: &[Value], test: fn(Ordering) -> bool) -> Result<Value> {
    let ordering = value::compare(&args[0], &args[1]).map_err(anyhow::Error::msg)?;
    Ok(Value::Bool(test(ordering)))
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn js_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn query_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push('+'),
            b => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}
