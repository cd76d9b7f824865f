//! Date helpers.
//!
//! Dates travel between functions as RFC 3339 strings in UTC. Inputs may
//! also be Unix timestamps. Layouts use Go's reference time
//! (`Mon Jan 2 15:04:05 MST 2006`) and are translated to chrono format
//! strings. Only the UTC zone is supported.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use std::fmt::Write;

use super::{Arity, FunctionLibrary, string};
use crate::template::value::{self, Num};

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("now", Arity::Exact(0), |_| Ok(rfc3339(Utc::now())));
    lib.pure("date", Arity::Exact(2), |args| format_date(&string(args, 0), &args[1], "UTC"));
    lib.pure("dateInZone", Arity::Exact(3), |args| format_date(&string(args, 0), &args[1], &string(args, 2)));
    lib.pure("unixEpoch", Arity::Exact(1), |args| Ok(Value::String(instant(&args[0])?.timestamp().to_string())));
    lib.pure("toDate", Arity::Exact(2), |args| to_date(&string(args, 0), &string(args, 1)));
}

fn rfc3339(dt: DateTime<Utc>) -> Value {
    Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Reads a date argument: an RFC 3339 string, a `YYYY-MM-DD` string, or Unix seconds.
fn instant(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::Number(_) => {
            let secs = match value::number(value) {
                Some(Num::Int(i)) => i,
                Some(Num::Float(f)) => f as i64,
                None => 0,
            };
            Utc.timestamp_opt(secs, 0).single().ok_or_else(|| anyhow!("timestamp {secs} out of range"))
        }
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("cannot parse date {s:?}"))?;
            Ok(day.and_time(chrono::NaiveTime::MIN).and_utc())
        }
        other => bail!("cannot use {} as a date", value::kind(other)),
    }
}

fn check_zone(zone: &str) -> Result<()> {
    match zone {
        "" | "UTC" | "Z" | "Etc/UTC" => Ok(()),
        other => bail!("unsupported time zone {other:?}, only UTC is available"),
    }
}

fn format_date(layout: &str, date: &Value, zone: &str) -> Result<Value> {
    check_zone(zone)?;
    let dt = instant(date)?;
    let mut out = String::new();
    write!(out, "{}", dt.format(&go_layout(layout))).map_err(|_| anyhow!("invalid date layout {layout:?}"))?;
    Ok(Value::String(out))
}

fn to_date(layout: &str, text: &str) -> Result<Value> {
    let format = go_layout(layout);
    let context = || format!("cannot parse {text:?} with layout {layout:?}");

    if format.contains("%z") || format.contains("%:z") {
        let dt = DateTime::parse_from_str(text, &format).with_context(context)?;
        return Ok(rfc3339(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, &format) {
        return Ok(rfc3339(naive.and_utc()));
    }
    let day = NaiveDate::parse_from_str(text, &format).with_context(context)?;
    Ok(rfc3339(day.and_time(chrono::NaiveTime::MIN).and_utc()))
}

/// Go reference-time elements and their chrono equivalents, longest first
/// where one is a prefix of another.
const LAYOUT_ELEMENTS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Monday", "%A"),
    ("Z07:00", "Z"),
    ("Z0700", "Z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    (".000000000", "%.9f"),
    (".000000", "%.6f"),
    (".000", "%.3f"),
    (".999999999", "%.f"),
    (".999999", "%.f"),
    (".999", "%.f"),
    ("2006", "%Y"),
    ("MST", "%Z"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("002", "%j"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("15", "%H"),
    ("_2", "%e"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// Translates a Go layout such as `2006-01-02 15:04` into `%Y-%m-%d %H:%M`.
pub(crate) fn go_layout(layout: &str) -> String {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while let Some(c) = rest.chars().next() {
        for (go, chrono_spec) in LAYOUT_ELEMENTS {
            if let Some(after) = rest.strip_prefix(go) {
                out.push_str(chrono_spec);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::funcs::test_support::{render, render_err};

    #[test]
    fn test_layout_translation() {
        assert_eq!(go_layout("2006-01-02T15:04:05Z07:00"), "%Y-%m-%dT%H:%M:%SZ");
        assert_eq!(go_layout("Jan 2, 2006 3:04PM"), "%b %-d, %Y %-I:%M%p");
        assert_eq!(go_layout("Monday %"), "%A %%");
    }

    #[test]
    fn test_date_formatting() {
        assert_eq!(render(r#"{{ date "2006-01-02" "2024-03-05T10:20:30Z" }}"#), "2024-03-05");
        assert_eq!(render(r#"{{ 0 | date "Jan 2, 2006 15:04" }}"#), "Jan 1, 1970 00:00");
        assert_eq!(render(r#"{{ dateInZone "15:04" "2024-03-05T10:20:30Z" "UTC" }}"#), "10:20");
        assert!(render_err(r#"{{ dateInZone "15:04" 0 "Europe/Paris" }}"#).contains("only UTC"));
    }

    #[test]
    fn test_epoch_and_parsing() {
        assert_eq!(render(r#"{{ unixEpoch "1970-01-01T00:01:00Z" }}"#), "60");
        assert_eq!(render(r#"{{ toDate "2006-01-02" "2024-03-05" }}"#), "2024-03-05T00:00:00Z");
        assert_eq!(render(r#"{{ toDate "2006-01-02 15:04" "2024-03-05 07:08" | date "15h04" }}"#), "07h08");
        assert!(render_err(r#"{{ toDate "2006-01-02" "not a date" }}"#).contains("cannot parse"));
    }

    #[test]
    fn test_now_is_rfc3339() {
        let now = render("{{ now }}");
        assert!(DateTime::parse_from_rfc3339(&now).is_ok(), "{now}");
    }
}
