//! String and regex helpers.
//!
//! Helpers that take a subject string take it last, so they read naturally
//! at the end of a pipeline: `{{ .name | trimSuffix "-svc" | upper }}`.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};

use super::{Arity, FunctionLibrary, int, list, string};
use crate::template::value;

fn text(s: impl Into<String>) -> Result<Value> {
    Ok(Value::String(s.into()))
}

pub(super) fn register(lib: &mut FunctionLibrary) {
    lib.pure("upper", Arity::Exact(1), |args| text(string(args, 0).to_uppercase()));
    lib.pure("lower", Arity::Exact(1), |args| text(string(args, 0).to_lowercase()));
    lib.pure("title", Arity::Exact(1), |args| text(title(&string(args, 0))));
    lib.pure("untitle", Arity::Exact(1), |args| text(untitle(&string(args, 0))));
    lib.pure("swapcase", Arity::Exact(1), |args| text(swapcase(&string(args, 0))));
    lib.pure("trim", Arity::Exact(1), |args| text(string(args, 0).trim()));
    lib.pure("trimAll", Arity::Exact(2), |args| {
        let cutset = string(args, 0);
        text(string(args, 1).trim_matches(|c: char| cutset.contains(c)))
    });
    lib.pure("trimPrefix", Arity::Exact(2), |args| {
        let s = string(args, 1);
        text(s.strip_prefix(string(args, 0).as_str()).unwrap_or(&s))
    });
    lib.pure("trimSuffix", Arity::Exact(2), |args| {
        let s = string(args, 1);
        text(s.strip_suffix(string(args, 0).as_str()).unwrap_or(&s))
    });
    lib.pure("nospace", Arity::Exact(1), |args| {
        text(string(args, 0).chars().filter(|c| !c.is_whitespace()).collect::<String>())
    });
    lib.pure("repeat", Arity::Exact(2), |args| {
        let count = usize::try_from(int(&args[0])?).context("negative repeat count")?;
        text(string(args, 1).repeat(count))
    });
    lib.pure("substr", Arity::Exact(3), |args| text(substr(int(&args[0])?, int(&args[1])?, &string(args, 2))));
    lib.pure("trunc", Arity::Exact(2), |args| text(trunc(int(&args[0])?, &string(args, 1))));
    lib.pure("abbrev", Arity::Exact(2), |args| text(abbrev(int(&args[0])?, &string(args, 1))));
    lib.pure("initials", Arity::Exact(1), |args| {
        text(string(args, 0).split_whitespace().filter_map(|w| w.chars().next()).collect::<String>())
    });
    lib.pure("wrap", Arity::Exact(2), |args| text(wrap(int(&args[0])?, &string(args, 1))));

    lib.pure("contains", Arity::Exact(2), |args| Ok(Value::Bool(string(args, 1).contains(&string(args, 0)))));
    lib.pure("hasPrefix", Arity::Exact(2), |args| {
        Ok(Value::Bool(string(args, 1).starts_with(&string(args, 0))))
    });
    lib.pure("hasSuffix", Arity::Exact(2), |args| Ok(Value::Bool(string(args, 1).ends_with(&string(args, 0)))));

    lib.pure("quote", Arity::AtLeast(0), |args| {
        text(non_nil(args).map(|s| value::quote(&s)).collect::<Vec<_>>().join(" "))
    });
    lib.pure("squote", Arity::AtLeast(0), |args| {
        text(non_nil(args).map(|s| format!("'{s}'")).collect::<Vec<_>>().join(" "))
    });
    lib.pure("cat", Arity::AtLeast(0), |args| text(non_nil(args).collect::<Vec<_>>().join(" ")));
    lib.pure("indent", Arity::Exact(2), |args| text(indent(int(&args[0])?, &string(args, 1))));
    lib.pure("nindent", Arity::Exact(2), |args| text(format!("\n{}", indent(int(&args[0])?, &string(args, 1)))));
    lib.pure("replace", Arity::Exact(3), |args| text(string(args, 2).replace(&string(args, 0), &string(args, 1))));
    lib.pure("plural", Arity::Exact(3), |args| {
        Ok(if int(&args[2])? == 1 { args[0].clone() } else { args[1].clone() })
    });

    lib.pure("snakecase", Arity::Exact(1), |args| text(words(&string(args, 0)).join("_")));
    lib.pure("kebabcase", Arity::Exact(1), |args| text(words(&string(args, 0)).join("-")));
    lib.pure("camelcase", Arity::Exact(1), |args| {
        text(string(args, 0).split('_').map(capitalize).collect::<String>())
    });

    lib.pure("split", Arity::Exact(2), |args| {
        let parts = string(args, 1);
        let map: Map<String, Value> = parts
            .split(string(args, 0).as_str())
            .enumerate()
            .map(|(i, part)| (format!("_{i}"), Value::String(part.to_string())))
            .collect();
        Ok(Value::Object(map))
    });
    lib.pure("splitList", Arity::Exact(2), |args| {
        let parts = string(args, 1);
        Ok(strings(parts.split(string(args, 0).as_str())))
    });
    lib.pure("join", Arity::Exact(2), |args| {
        let sep = string(args, 0);
        match &args[1] {
            Value::Array(items) => text(items.iter().map(value::to_str).collect::<Vec<_>>().join(&sep)),
            other => text(value::to_str(other)),
        }
    });
    lib.pure("toString", Arity::Exact(1), |args| text(value::format_value(&args[0])));
    lib.pure("toStrings", Arity::Exact(1), |args| {
        Ok(strings(list(&args[0], "toStrings")?.iter().map(value::format_value)))
    });

    lib.pure("regexMatch", Arity::Exact(2), |args| Ok(Value::Bool(regex(args)?.is_match(&string(args, 1)))));
    lib.pure("regexFind", Arity::Exact(2), |args| {
        let s = string(args, 1);
        text(regex(args)?.find(&s).map_or("", |m| m.as_str()))
    });
    lib.pure("regexFindAll", Arity::Exact(3), |args| {
        let s = string(args, 1);
        let limit = limit(int(&args[2])?);
        Ok(strings(regex(args)?.find_iter(&s).take(limit).map(|m| m.as_str())))
    });
    lib.pure("regexReplaceAll", Arity::Exact(3), |args| {
        text(regex(args)?.replace_all(&string(args, 1), string(args, 2).as_str()))
    });
    lib.pure("regexSplit", Arity::Exact(3), |args| {
        let s = string(args, 1);
        let re = regex(args)?;
        Ok(match int(&args[2])? {
            0 => Value::Array(Vec::new()),
            n if n < 0 => strings(re.split(&s)),
            n => strings(re.splitn(&s, limit(n))),
        })
    });
}

fn strings<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
}

fn non_nil(args: &[Value]) -> impl Iterator<Item = String> + '_ {
    args.iter().filter(|a| !a.is_null()).map(value::format_value)
}

fn regex(args: &[Value]) -> Result<Regex> {
    let pattern = string(args, 0);
    Regex::new(&pattern).with_context(|| format!("invalid regular expression {pattern:?}"))
}

fn limit(n: i64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric() && c != '\'' && c != '_';
    }
    out
}

fn untitle(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

fn swapcase(s: &str) -> String {
    s.chars()
        .flat_map(|c| {
            let swapped: Vec<char> = if c.is_uppercase() {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            swapped
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase words split at separators and case changes:
/// `HTTPServerName` and `http server-name` both give `http server name`.
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn substr(start: i64, end: i64, s: &str) -> String {
    let len = s.chars().count();
    let end_index = usize::try_from(end).ok().filter(|&e| e <= len);
    match (usize::try_from(start).ok(), end_index) {
        (None, Some(end)) => char_slice(s, 0, end),
        (None, None) => s.to_string(),
        (Some(start), None) => char_slice(s, start, len),
        (Some(start), Some(end)) => char_slice(s, start, end),
    }
}

fn trunc(count: i64, s: &str) -> String {
    let len = s.chars().count() as i64;
    if count >= 0 && len > count {
        char_slice(s, 0, count as usize)
    } else if count < 0 && len + count > 0 {
        char_slice(s, (len + count) as usize, len as usize)
    } else {
        s.to_string()
    }
}

fn abbrev(width: i64, s: &str) -> String {
    let len = s.chars().count() as i64;
    if width < 4 || len <= width {
        return s.to_string();
    }
    format!("{}...", char_slice(s, 0, (width - 3) as usize))
}

fn indent(spaces: i64, s: &str) -> String {
    let pad = " ".repeat(usize::try_from(spaces).unwrap_or(0));
    format!("{pad}{}", s.replace('\n', &format!("\n{pad}")))
}

/// Greedy word wrap; words longer than the width stay whole.
fn wrap(width: i64, s: &str) -> String {
    let width = usize::try_from(width).unwrap_or(0).max(1);
    s.lines()
        .map(|line| {
            let mut out = String::new();
            let mut line_len = 0;
            for word in line.split_whitespace() {
                let word_len = word.chars().count();
                if line_len > 0 && line_len + 1 + word_len > width {
                    out.push('\n');
                    line_len = 0;
                } else if line_len > 0 {
                    out.push(' ');
                    line_len += 1;
                }
                out.push_str(word);
                line_len += word_len;
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}
