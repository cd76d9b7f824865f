//! List helpers. Lists are never modified in place; every helper returns a new one.

use anyhow::{Result, bail};
use serde_json::Value;

use super::{Arity, FunctionLibrary, int, list};
use crate::template::value::{self, truthy};

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("list", Arity::AtLeast(0), |args| Ok(Value::Array(args.to_vec())));
    lib.pure("first", Arity::Exact(1), |args| {
        Ok(list(&args[0], "first")?.first().cloned().unwrap_or(Value::Null))
    });
    lib.pure("last", Arity::Exact(1), |args| Ok(list(&args[0], "last")?.last().cloned().unwrap_or(Value::Null)));
    lib.pure("rest", Arity::Exact(1), |args| {
        let items = list(&args[0], "rest")?;
        Ok(items.split_first().map_or(Value::Null, |(_, rest)| Value::Array(rest.to_vec())))
    });
    lib.pure("initial", Arity::Exact(1), |args| {
        let items = list(&args[0], "initial")?;
        Ok(items.split_last().map_or(Value::Null, |(_, init)| Value::Array(init.to_vec())))
    });
    lib.pure("append", Arity::Exact(2), append);
    lib.pure("push", Arity::Exact(2), append);
    lib.pure("prepend", Arity::Exact(2), |args| {
        let mut items = vec![args[1].clone()];
        items.extend_from_slice(list(&args[0], "prepend")?);
        Ok(Value::Array(items))
    });
    lib.pure("concat", Arity::AtLeast(0), |args| {
        let mut items = Vec::new();
        for arg in args {
            items.extend_from_slice(list(arg, "concat")?);
        }
        Ok(Value::Array(items))
    });
    lib.pure("reverse", Arity::Exact(1), |args| {
        Ok(Value::Array(list(&args[0], "reverse")?.iter().rev().cloned().collect()))
    });
    lib.pure("uniq", Arity::Exact(1), |args| {
        let mut items: Vec<Value> = Vec::new();
        for item in list(&args[0], "uniq")? {
            if !items.contains(item) {
                items.push(item.clone());
            }
        }
        Ok(Value::Array(items))
    });
    lib.pure("without", Arity::AtLeast(1), |args| {
        let omit = &args[1..];
        Ok(Value::Array(list(&args[0], "without")?.iter().filter(|i| !omit.contains(i)).cloned().collect()))
    });
    lib.pure("has", Arity::Exact(2), |args| Ok(Value::Bool(list(&args[1], "has")?.contains(&args[0]))));
    lib.pure("compact", Arity::Exact(1), |args| {
        Ok(Value::Array(list(&args[0], "compact")?.iter().filter(|i| truthy(i)).cloned().collect()))
    });
    lib.pure("sortAlpha", Arity::Exact(1), |args| {
        let mut items: Vec<String> = match &args[0] {
            Value::Array(items) => items.iter().map(value::to_str).collect(),
            other => vec![value::to_str(other)],
        };
        items.sort();
        Ok(Value::Array(items.into_iter().map(Value::String).collect()))
    });

    lib.pure("until", Arity::Exact(1), |args| {
        let n = int(&args[0])?;
        step_range(0, n, if n < 0 { -1 } else { 1 })
    });
    lib.pure("untilStep", Arity::Exact(3), |args| step_range(int(&args[0])?, int(&args[1])?, int(&args[2])?));
    lib.pure("seq", Arity::Range(1, 3), seq);
}

fn append(args: &[Value]) -> Result<Value> {
    let mut items = list(&args[0], "append")?.to_vec();
    items.push(args[1].clone());
    Ok(Value::Array(items))
}

/// Integers from `start` towards `stop` (exclusive). A step pointing away
/// from `stop` gives an empty list.
fn range_values(start: i64, stop: i64, step: i64) -> Vec<i64> {
    let mut out = Vec::new();
    if step == 0 {
        return out;
    }
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i);
        i += step;
    }
    out
}

fn step_range(start: i64, stop: i64, step: i64) -> Result<Value> {
    Ok(Value::Array(range_values(start, stop, step).into_iter().map(Value::from).collect()))
}

/// `seq END`, `seq START END`, `seq START STEP END`, inclusive, space separated.
fn seq(args: &[Value]) -> Result<Value> {
    let nums = args.iter().map(int).collect::<Result<Vec<_>>>()?;
    let (start, step, end) = match nums.as_slice() {
        [end] => (1, if *end < 1 { -1 } else { 1 }, *end),
        [start, end] => (*start, if end < start { -1 } else { 1 }, *end),
        [start, step, end] => {
            if (*end < *start && *step > 0) || (*end > *start && *step < 0) || *step == 0 {
                return Ok(Value::String(String::new()));
            }
            (*start, *step, *end)
        }
        _ => bail!("seq takes one to three arguments"),
    };
    let stop = if step > 0 { end + 1 } else { end - 1 };
    let text: Vec<String> = range_values(start, stop, step).iter().map(i64::to_string).collect();
    Ok(Value::String(text.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::funcs::test_support::{render, render_err};

    #[test]
    fn test_accessors() {
        assert_eq!(render("{{ $l := list 1 2 3 }}{{ first $l }} {{ last $l }} {{ rest $l }} {{ initial $l }}"), "1 3 [2 3] [1 2]");
        assert_eq!(render("{{ first (list) }}"), "<no value>");
        assert!(render_err(r#"{{ first "abc" }}"#).contains("cannot first on type string"));
    }

    #[test]
    fn test_building() {
        assert_eq!(render("{{ append (list 1) 2 }} {{ prepend (list 1) 0 }} {{ concat (list 1) (list 2 3) }}"), "[1 2] [0 1] [1 2 3]");
        assert_eq!(render("{{ reverse (list 1 2 3) }} {{ uniq (list 1 1 2 1) }} {{ without (list 1 2 3 2) 2 }}"), "[3 2 1] [1 2] [1 3]");
        assert_eq!(render(r#"{{ compact (list 1 "" 0 "a" nil) }} {{ has 2 (list 1 2) }}"#), "[1 a] true");
        assert_eq!(render(r#"{{ sortAlpha (list "b" "c" "a") }}"#), "[a b c]");
    }

    #[test]
    fn test_ranges() {
        assert_eq!(render("{{ until 3 }} {{ until -2 }} {{ untilStep 1 10 3 }}"), "[0 1 2] [0 -1] [1 4 7]");
        assert_eq!(render("{{ range $i := until 3 }}{{ $i }}{{ end }}"), "012");
    }

    #[test]
    fn test_seq() {
        assert_eq!(seq(&[Value::from(3)]).unwrap(), Value::from("1 2 3"));
        assert_eq!(seq(&[Value::from(5), Value::from(3)]).unwrap(), Value::from("5 4 3"));
        assert_eq!(seq(&[Value::from(0), Value::from(2), Value::from(6)]).unwrap(), Value::from("0 2 4 6"));
        assert_eq!(seq(&[Value::from(0), Value::from(-1), Value::from(6)]).unwrap(), Value::from(""));
    }
}
