//! Integer and float arithmetic.
//!
//! Integer helpers convert every argument to a 64-bit integer first, so
//! `add 1 "2" 3.9` is `6`. Overflow and division by zero are errors.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::{Arity, FunctionLibrary, float, int, string};
use crate::template::value;

fn ints(args: &[Value]) -> Result<Vec<i64>> {
    args.iter().map(int).collect()
}

fn fold(args: &[Value], op: fn(i64, i64) -> Option<i64>, name: &str) -> Result<Value> {
    let nums = ints(args)?;
    let mut iter = nums.into_iter();
    let first = iter.next().unwrap_or(0);
    let total = iter.try_fold(first, op).with_context(|| format!("integer overflow in {name}"))?;
    Ok(Value::from(total))
}

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("add", Arity::AtLeast(1), |args| fold(args, i64::checked_add, "add"));
    lib.pure("add1", Arity::Exact(1), |args| {
        Ok(Value::from(int(&args[0])?.checked_add(1).context("integer overflow in add1")?))
    });
    lib.pure("sub", Arity::Exact(2), |args| fold(args, i64::checked_sub, "sub"));
    lib.pure("mul", Arity::AtLeast(1), |args| fold(args, i64::checked_mul, "mul"));
    lib.pure("div", Arity::Exact(2), |args| {
        if int(&args[1])? == 0 {
            bail!("integer divide by zero");
        }
        fold(args, i64::checked_div, "div")
    });
    lib.pure("mod", Arity::Exact(2), |args| {
        if int(&args[1])? == 0 {
            bail!("integer divide by zero");
        }
        fold(args, i64::checked_rem, "mod")
    });
    lib.pure("max", Arity::AtLeast(1), |args| Ok(Value::from(ints(args)?.into_iter().max().unwrap_or(0))));
    lib.pure("min", Arity::AtLeast(1), |args| Ok(Value::from(ints(args)?.into_iter().min().unwrap_or(0))));

    lib.pure("floor", Arity::Exact(1), |args| Ok(value::float(float(&args[0])?.floor())));
    lib.pure("ceil", Arity::Exact(1), |args| Ok(value::float(float(&args[0])?.ceil())));
    lib.pure("round", Arity::Range(2, 3), round);

    lib.pure("int", Arity::Exact(1), |args| Ok(Value::from(int(&args[0])?)));
    lib.pure("int64", Arity::Exact(1), |args| Ok(Value::from(int(&args[0])?)));
    lib.pure("float64", Arity::Exact(1), |args| Ok(value::float(float(&args[0])?)));
    lib.pure("atoi", Arity::Exact(1), |args| Ok(Value::from(string(args, 0).trim().parse::<i64>().unwrap_or(0))));
}

/// `round VALUE PRECISION [ROUND_ON]`, rounding half up by default.
fn round(args: &[Value]) -> Result<Value> {
    let x = float(&args[0])?;
    let precision = i32::try_from(int(&args[1])?).context("precision out of range")?;
    let round_on = match args.get(2) {
        Some(v) => float(v)?,
        None => 0.5,
    };

    let pow = 10f64.powi(precision);
    let scaled = x * pow;
    let int_part = scaled.trunc();
    let frac = (scaled - int_part).abs();
    let rounded = if frac >= round_on { int_part + scaled.signum() } else { int_part };
    Ok(value::float(rounded / pow))
}

#[cfg(test)]
mod tests {
    use crate::template::funcs::test_support::{render, render_err};

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(render(r#"{{ add 1 "2" 3.9 }} {{ add1 9 }} {{ sub 10 4 }} {{ mul 2 3 4 }}"#), "6 10 6 24");
        assert_eq!(render("{{ div 7 2 }} {{ mod 7 2 }} {{ max 3 9 1 }} {{ min 3 9 1 }}"), "3 1 9 1");
        assert!(render_err("{{ div 1 0 }}").contains("integer divide by zero"));
        assert!(render_err("{{ add 9223372036854775807 1 }}").contains("overflow"));
    }

    #[test]
    fn test_float_helpers() {
        assert_eq!(render("{{ floor 1.7 }} {{ ceil 1.2 }} {{ round 3.14159 2 }} {{ round 2.5 0 }} {{ round -1.25 1 }}"), "1 2 3.14 3 -1.3");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(render(r#"{{ int "42" }} {{ int64 3.9 }} {{ float64 "1.5" }} {{ atoi "x" }} {{ atoi " 7 " }}"#), "42 3 1.5 0 7");
    }
}
