//! Splits template text into literal text and tokenized actions.

use super::TemplateError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

/// A token inside `{{ }}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `.`
    Dot,
    /// `.a.b`
    Field(Vec<String>),
    /// `$name.a.b`; `$` alone has an empty name
    Var(String, Vec<String>),
    /// `.a.b` directly after a closing parenthesis
    Chain(Vec<String>),
    /// Function names, keywords, `true`, `false`, `nil`
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    Pipe,
    Declare,
    Assign,
    Comma,
}

/// Text between actions, or one action.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Action {
        line: usize,
        tokens: Vec<Token>,
    },
}

/// Lexes a whole template.
///
/// Comments produce no piece. Trim markers (`{{- ` and ` -}}`) are applied
/// here, so the returned text pieces are final.
pub fn lex(name: &str, input: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    while pos < input.len() {
        let Some(offset) = input[pos..].find(LEFT_DELIM) else {
            push_text(&mut pieces, &input[pos..], trim_next, false);
            break;
        };
        let start = pos + offset;
        let mut inner = start + LEFT_DELIM.len();

        let trim_left = input[inner..].starts_with("- ")
            || input[inner..].starts_with("-\t")
            || input[inner..].starts_with("-\n")
            || input[inner..].starts_with("-\r");
        if trim_left {
            inner += 1;
        }
        push_text(&mut pieces, &input[pos..start], trim_next, trim_left);

        let line = line_at(input, start);
        let syntax = |message: String| TemplateError::Syntax {
            name: name.to_string(),
            line,
            message,
        };

        let body_start = skip_space(input, inner);
        let (tokens, end) = if input[body_start..].starts_with(LEFT_COMMENT) {
            let Some(close) = input[body_start..].find(RIGHT_COMMENT) else {
                return Err(syntax("unclosed comment".to_string()));
            };
            let after = skip_space(input, body_start + close + RIGHT_COMMENT.len());
            if !(input[after..].starts_with(RIGHT_DELIM) || input[after..].starts_with("-}}")) {
                return Err(syntax("comment ends before closing delimiter".to_string()));
            }
            (Vec::new(), after)
        } else {
            lex_action(input, inner).map_err(syntax)?
        };

        trim_next = input[end..].starts_with('-');
        let close = if trim_next { end + 1 } else { end };
        if !input[close..].starts_with(RIGHT_DELIM) {
            return Err(syntax("unclosed action".to_string()));
        }
        pos = close + RIGHT_DELIM.len();

        let is_comment = input[body_start..].starts_with(LEFT_COMMENT);
        if !is_comment {
            pieces.push(Piece::Action {
                line,
                tokens,
            });
        }
    }

    Ok(pieces)
}

fn push_text(pieces: &mut Vec<Piece>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(text.to_string()));
    }
}

fn line_at(input: &str, pos: usize) -> usize {
    1 + input[..pos].bytes().filter(|b| *b == b'\n').count()
}

fn skip_space(input: &str, mut pos: usize) -> usize {
    while let Some(c) = input[pos..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lexes tokens from `pos` up to (not including) the closing delimiter or
/// its trim marker. Returns the tokens and the position of the delimiter.
fn lex_action(input: &str, mut pos: usize) -> Result<(Vec<Token>, usize), String> {
    let mut tokens = Vec::new();

    loop {
        pos = skip_space(input, pos);
        let rest = &input[pos..];
        if rest.is_empty() {
            return Err("unclosed action".to_string());
        }
        if rest.starts_with(RIGHT_DELIM) {
            return Ok((tokens, pos));
        }
        // ` -}}` trims; `-}}` without a space is a syntax error in the wild
        if rest.starts_with("-}}") && input[..pos].ends_with(char::is_whitespace) {
            return Ok((tokens, pos));
        }

        let c = rest.chars().next().unwrap_or_default();
        match c {
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
                if input[pos..].starts_with('.') {
                    let (fields, next) = lex_fields(input, pos)?;
                    tokens.push(Token::Chain(fields));
                    pos = next;
                }
            }
            '|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            '=' => {
                tokens.push(Token::Assign);
                pos += 1;
            }
            ':' => {
                if !rest.starts_with(":=") {
                    return Err("expected :=".to_string());
                }
                tokens.push(Token::Declare);
                pos += 2;
            }
            '"' => {
                let (s, next) = lex_quoted(input, pos)?;
                tokens.push(Token::Str(s));
                pos = next;
            }
            '`' => {
                let Some(close) = rest[1..].find('`') else {
                    return Err("unterminated raw quoted string".to_string());
                };
                tokens.push(Token::Str(rest[1..=close].to_string()));
                pos += close + 2;
            }
            '\'' => {
                let (value, next) = lex_char(input, pos)?;
                tokens.push(Token::Int(value));
                pos = next;
            }
            '$' => {
                let mut end = pos + 1;
                while let Some(ch) = input[end..].chars().next() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    end += ch.len_utf8();
                }
                let name = input[pos + 1..end].to_string();
                let (fields, next) = if input[end..].starts_with('.') {
                    lex_fields(input, end)?
                } else {
                    (Vec::new(), end)
                };
                tokens.push(Token::Var(name, fields));
                pos = next;
            }
            '.' => {
                let after = input[pos + 1..].chars().next();
                match after {
                    Some(ch) if ch.is_ascii_digit() => {
                        let (token, next) = lex_number(input, pos)?;
                        tokens.push(token);
                        pos = next;
                    }
                    Some(ch) if is_ident_start(ch) => {
                        let (fields, next) = lex_fields(input, pos)?;
                        tokens.push(Token::Field(fields));
                        pos = next;
                    }
                    _ => {
                        tokens.push(Token::Dot);
                        pos += 1;
                    }
                }
            }
            '-' | '+' | '0'..='9' => {
                let (token, next) = lex_number(input, pos)?;
                tokens.push(token);
                pos = next;
            }
            c if is_ident_start(c) => {
                let mut end = pos;
                while let Some(ch) = input[end..].chars().next() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    end += ch.len_utf8();
                }
                tokens.push(Token::Ident(input[pos..end].to_string()));
                pos = end;
            }
            other => return Err(format!("unexpected {other:?} in command")),
        }
    }
}

/// Lexes `.a.b.c` starting at a `.`.
fn lex_fields(input: &str, mut pos: usize) -> Result<(Vec<String>, usize), String> {
    let mut fields = Vec::new();
    while input[pos..].starts_with('.') {
        let start = pos + 1;
        let mut end = start;
        while let Some(ch) = input[end..].chars().next() {
            if !is_ident_char(ch) {
                break;
            }
            end += ch.len_utf8();
        }
        if end == start {
            return Err("bad character after '.' in field chain".to_string());
        }
        fields.push(input[start..end].to_string());
        pos = end;
    }
    Ok((fields, pos))
}

fn lex_number(input: &str, pos: usize) -> Result<(Token, usize), String> {
    let rest = &input[pos..];
    let end = rest
        .char_indices()
        .find(|(i, c)| {
            !(c.is_ascii_alphanumeric()
                || *c == '.'
                || *c == '_'
                || ((*c == '-' || *c == '+')
                    && (*i == 0 || rest[..*i].ends_with(['e', 'E', 'p', 'P']))))
        })
        .map_or(rest.len(), |(i, _)| i);
    let literal = &rest[..end];
    let cleaned = literal.replace('_', "");

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let radix = if digits.starts_with("0x") || digits.starts_with("0X") {
        Some((16, &digits[2..]))
    } else if digits.starts_with("0o") || digits.starts_with("0O") {
        Some((8, &digits[2..]))
    } else if digits.starts_with("0b") || digits.starts_with("0B") {
        Some((2, &digits[2..]))
    } else {
        None
    };

    let token = if let Some((radix, body)) = radix {
        i64::from_str_radix(body, radix)
            .map(|v| Token::Int(if negative { -v } else { v }))
            .map_err(|_| format!("bad number syntax: {literal:?}"))?
    } else if let Ok(v) = cleaned.parse::<i64>() {
        Token::Int(v)
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("integer overflow: {literal:?}"));
    } else if let Some(v) = cleaned.parse::<f64>().ok().filter(|v| v.is_finite()) {
        Token::Float(v)
    } else {
        return Err(format!("bad number syntax: {literal:?}"));
    };
    Ok((token, pos + end))
}

fn lex_quoted(input: &str, pos: usize) -> Result<(String, usize), String> {
    let mut out = String::new();
    let mut chars = input[pos + 1..].char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, pos + 1 + i + 1)),
            '\n' => break,
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    break;
                };
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
                    '\'' => out.push('\''),
                    '0' => out.push('\0'),
                    'a' => out.push('\u{7}'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    'x' | 'u' | 'U' => {
                        let len = match esc {
                            'x' => 2,
                            'u' => 4,
                            _ => 8,
                        };
                        let hex: String = chars.by_ref().take(len).map(|(_, h)| h).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| format!("invalid escape \\{esc}{hex}"))?;
                        let ch = char::from_u32(code)
                            .ok_or_else(|| format!("invalid escape \\{esc}{hex}"))?;
                        out.push(ch);
                    }
                    other => return Err(format!("unknown escape sequence: \\{other}")),
                }
            }
            c => out.push(c),
        }
    }
    Err("unterminated quoted string".to_string())
}

fn lex_char(input: &str, pos: usize) -> Result<(i64, usize), String> {
    let rest = &input[pos + 1..];
    let mut chars = rest.char_indices();
    let value = match chars.next() {
        Some((_, '\\')) => match chars.next() {
            Some((_, 'n')) => '\n',
            Some((_, 't')) => '\t',
            Some((_, '\\')) => '\\',
            Some((_, '\'')) => '\'',
            _ => return Err("unsupported character escape".to_string()),
        },
        Some((_, c)) => c,
        None => return Err("unterminated character constant".to_string()),
    };
    match chars.next() {
        Some((i, '\'')) => Ok((i64::from(u32::from(value)), pos + 1 + i + 1)),
        _ => Err("unterminated character constant".to_string()),
    }
}
