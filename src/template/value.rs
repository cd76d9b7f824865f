//! Value semantics shared by the executor and the function library.
//!
//! Data is plain [`serde_json::Value`]. Printing, truthiness, and comparison
//! follow Go's `fmt` and `text/template` rules so that rendered output
//! matches what users of Go templates expect.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt::Write;

use crate::constants::NO_VALUE_MARKER;

/// A number taken out of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

/// Reads a number, if the value is one.
pub fn number(value: &Value) -> Option<Num> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        Some(Num::Int(i))
    } else {
        n.as_f64().map(Num::Float)
    }
}

/// Builds a value from a float, falling back to a string for NaN and infinities.
pub fn float(f: f64) -> Value {
    Number::from_f64(f).map_or_else(|| Value::String(format_float(f)), Value::Number)
}

/// Go-style name of a value's type, used in error messages.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "<nil>",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float64",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "[]interface {}",
        Value::Object(_) => "map[string]interface {}",
    }
}

/// Go template truthiness: false, 0, "", nil and empty collections are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => number(value).is_some_and(|n| n.as_f64() != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Text emitted for the result of an action.
pub fn print_action(value: &Value) -> String {
    match value {
        Value::Null => NO_VALUE_MARKER.to_string(),
        other => format_value(other),
    }
}

/// Go `%v` formatting.
pub fn format_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("<nil>"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => out.push_str(&i.to_string()),
            None if n.is_u64() => out.push_str(&n.to_string()),
            None => out.push_str(&format_float(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push_str("map[");
            for (i, (key, item)) in sorted_entries(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                write_value(out, item);
            }
            out.push(']');
        }
    }
}

/// Map entries in ascending key order.
pub fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Formats a float the way Go's `%v` does: shortest representation,
/// exponent form when the exponent is below -4 or at least 6.
pub fn format_float(f: f64) -> String {
    format_g(f, None)
}

/// Go's `%g`. Without a precision the shortest round-tripping digits are
/// used; with one the value is rounded to that many significant digits.
fn format_g(f: f64, precision: Option<usize>) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let sci = match precision {
        Some(p) => format!("{:.*e}", p.max(1) - 1, f.abs()),
        None => format!("{:e}", f.abs()),
    };
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };

    let nd = digits.len() as i32;
    let dp = exp + 1;
    let eprec = match precision {
        None => 6,
        Some(p) => {
            let p = p.max(1) as i32;
            if p > nd && nd >= dp { nd } else { p }
        }
    };

    let body = if f != 0.0 && (exp < -4 || exp >= eprec) {
        let mantissa =
            if nd > 1 { format!("{}.{}", &digits[..1], &digits[1..]) } else { digits.to_string() };
        go_exponent(&mantissa, exp)
    } else if f == 0.0 {
        "0".to_string()
    } else if dp <= 0 {
        format!("0.{}{digits}", "0".repeat(dp.unsigned_abs() as usize))
    } else if dp >= nd {
        format!("{digits}{}", "0".repeat((dp - nd) as usize))
    } else {
        format!("{}.{}", &digits[..dp as usize], &digits[dp as usize..])
    };

    if f.is_sign_negative() && f != 0.0 { format!("-{body}") } else { body }
}

fn go_exponent(mantissa: &str, exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

/// Lenient string view used by string helpers: null is empty, other
/// non-strings use their `%v` form.
pub fn to_str(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => format_value(other),
    }
}

/// Equality as in Go's `eq`, with numbers compared by value across int and float.
pub fn equal(a: &Value, b: &Value) -> Result<bool, String> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Ok(a.is_null() && b.is_null()),
        (Value::Number(_), Value::Number(_)) => Ok(compare_numbers(a, b) == Ordering::Equal),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            Err(format!("non-comparable type {}", kind(a)))
        }
        _ => Err("incompatible types for comparison".to_string()),
    }
}

/// Ordering as in Go's `lt`: only numbers and strings are ordered.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, String> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => Ok(compare_numbers(a, b)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            Err("incompatible types for comparison".to_string())
        }
        _ => Err(format!("invalid type for comparison: {}", kind(a))),
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (number(a), number(b)) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => x.cmp(&y),
        (Some(x), Some(y)) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Go's `fmt.Sprint`: spaces only between operands when neither is a string.
pub fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !arg.is_string() && !args[i - 1].is_string() {
            out.push(' ');
        }
        write_value(&mut out, arg);
    }
    out
}

/// Go's `fmt.Sprintln`: always spaced, newline terminated.
pub fn sprintln(args: &[Value]) -> String {
    let mut out = args.iter().map(format_value).collect::<Vec<_>>().join(" ");
    out.push('\n');
    out
}

/// Double-quoted string literal with Go escapes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Default)]
struct Spec {
    minus: bool,
    plus: bool,
    zero: bool,
    space: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Go's `fmt.Sprintf` for the common verbs.
///
/// Supports `%v %s %d %f %e %g %q %t %x %X %o %b %c %%` with the
/// `- + 0 space #` flags, width and precision. Mismatched arguments render
/// as `%!verb(type=value)` the way Go does rather than failing.
pub fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                ' ' => spec.space = true,
                '#' => spec.sharp = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = read_digits(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_digits(&mut chars).unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        let Some(arg) = args.get(next_arg) else {
            let _ = write!(out, "%!{verb}(MISSING)");
            continue;
        };
        next_arg += 1;

        let body = format_verb(verb, &spec, arg);
        out.push_str(&pad(body, &spec, arg.is_number()));
    }

    if next_arg < args.len() {
        out.push_str("%!(EXTRA ");
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|arg| format!("{}={}", kind(arg), format_value(arg)))
            .collect();
        out.push_str(&extra.join(", "));
        out.push(')');
    }
    out
}

fn read_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{verb}({}={})", kind(arg), format_value(arg))
}

fn signed(body: String, negative: bool, spec: &Spec) -> String {
    if negative {
        format!("-{body}")
    } else if spec.plus {
        format!("+{body}")
    } else if spec.space {
        format!(" {body}")
    } else {
        body
    }
}

fn format_verb(verb: char, spec: &Spec, arg: &Value) -> String {
    match verb {
        'v' => match number(arg) {
            Some(Num::Int(i)) => signed(i.unsigned_abs().to_string(), i < 0, spec),
            _ => format_value(arg),
        },
        's' => {
            let s = format_value(arg);
            match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            }
        }
        'q' => match (arg, number(arg)) {
            (Value::String(s), _) => quote(s),
            (_, Some(Num::Int(i))) => match u32::try_from(i).ok().and_then(char::from_u32) {
                Some(c) => format!("'{c}'"),
                None => bad_verb(verb, arg),
            },
            _ => bad_verb(verb, arg),
        },
        't' => match arg {
            Value::Bool(b) => b.to_string(),
            _ => bad_verb(verb, arg),
        },
        'c' => match number(arg) {
            Some(Num::Int(i)) => u32::try_from(i)
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| "\u{fffd}".to_string(), String::from),
            _ => bad_verb(verb, arg),
        },
        'd' | 'x' | 'X' | 'o' | 'b' => format_integer(verb, spec, arg),
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => match number(arg) {
            Some(n) => {
                let f = n.as_f64();
                signed(format_float_verb(verb, spec.precision, f.abs()), f.is_sign_negative() && f != 0.0, spec)
            }
            None => bad_verb(verb, arg),
        },
        _ => bad_verb(verb, arg),
    }
}

fn format_integer(verb: char, spec: &Spec, arg: &Value) -> String {
    if let Value::String(s) = arg
        && matches!(verb, 'x' | 'X')
    {
        let encoded = hex::encode(s.as_bytes());
        return if verb == 'X' { encoded.to_uppercase() } else { encoded };
    }
    let Some(Num::Int(i)) = number(arg) else {
        return bad_verb(verb, arg);
    };
    let magnitude = i.unsigned_abs();
    let digits = match verb {
        'x' => format!("{}{magnitude:x}", if spec.sharp { "0x" } else { "" }),
        'X' => format!("{}{magnitude:X}", if spec.sharp { "0X" } else { "" }),
        'o' => format!("{}{magnitude:o}", if spec.sharp { "0" } else { "" }),
        'b' => format!("{magnitude:b}"),
        _ => magnitude.to_string(),
    };
    signed(digits, i < 0, spec)
}

fn format_float_verb(verb: char, precision: Option<usize>, f: f64) -> String {
    match verb {
        'f' | 'F' => format!("{f:.*}", precision.unwrap_or(6)),
        'e' | 'E' => {
            let s = format!("{f:.*e}", precision.unwrap_or(6));
            let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
            let s = go_exponent(mantissa, exp.parse().unwrap_or(0));
            if verb == 'E' { s.to_uppercase() } else { s }
        }
        _ => {
            let s = format_g(f, precision);
            if verb == 'G' { s.to_uppercase() } else { s }
        }
    }
}

fn pad(body: String, spec: &Spec, numeric: bool) -> String {
    let Some(width) = spec.width else {
        return body;
    };
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if spec.minus {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.zero && numeric {
        // Zeros go between the sign and the digits
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), body[1..].to_string()),
            _ => (String::new(), body),
        };
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}
