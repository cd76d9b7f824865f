//! Parser from lexed pieces to template trees.

use std::collections::HashSet;

use super::TemplateError;
use super::lexer::{Piece, Token};

/// A node of a parsed template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action {
        line: usize,
        pipe: Pipeline,
    },
    If {
        line: usize,
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    With {
        line: usize,
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    Range {
        line: usize,
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
    Template {
        line: usize,
        name: String,
        pipe: Option<Pipeline>,
    },
    Break {
        line: usize,
    },
    Continue {
        line: usize,
    },
}

/// `$x := cmd | cmd`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Declared or assigned variables, without the `$`
    pub vars: Vec<String>,
    /// Whether `vars` are assigned (`=`) rather than declared (`:=`)
    pub assign: bool,
    pub commands: Vec<Command>,
}

/// One stage of a pipeline: an operand optionally followed by arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Dot,
    Nil,
    Bool(bool),
    Str(String),
    Int(i64),
    Float(f64),
    Field(Vec<String>),
    Variable(String, Vec<String>),
    Function(String),
    Pipeline(Box<Pipeline>, Vec<String>),
}

/// Everything one template text defines.
#[derive(Debug, Default)]
pub struct ParsedTemplate {
    /// The top-level body
    pub body: Vec<Node>,
    /// `define` and `block` bodies, in source order
    pub defines: Vec<(String, Vec<Node>)>,
}

enum Terminator {
    Eof,
    End,
    Else {
        line: usize,
        tokens: Vec<Token>,
    },
}

/// Parses lexed pieces into a body plus its definitions.
///
/// `functions` is the set of names callable from the template; any other
/// identifier used as a function is a syntax error.
pub fn parse(
    name: &str,
    pieces: Vec<Piece>,
    functions: &HashSet<&str>,
) -> Result<ParsedTemplate, TemplateError> {
    let mut parser = Parser {
        name,
        pieces: pieces.into_iter(),
        functions,
        vars: vec![String::new()],
        range_depth: 0,
        defines: Vec::new(),
        top_level: true,
    };

    let (body, terminator) = parser.parse_list()?;
    match terminator {
        Terminator::Eof => Ok(ParsedTemplate {
            body,
            defines: parser.defines,
        }),
        Terminator::End => Err(parser.error(0, "unexpected {{end}}")),
        Terminator::Else {
            line,
            ..
        } => Err(parser.error(line, "unexpected {{else}}")),
    }
}

struct Parser<'a> {
    name: &'a str,
    pieces: std::vec::IntoIter<Piece>,
    functions: &'a HashSet<&'a str>,
    /// Variables in scope, innermost last; `""` is `$`
    vars: Vec<String>,
    range_depth: usize,
    defines: Vec<(String, Vec<Node>)>,
    top_level: bool,
}

impl Parser<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::Syntax {
            name: self.name.to_string(),
            line,
            message: message.into(),
        }
    }

    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(piece) = self.pieces.next() {
            let (line, tokens) = match piece {
                Piece::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Piece::Action {
                    line,
                    tokens,
                } => (line, tokens),
            };

            let keyword = match tokens.first() {
                Some(Token::Ident(word)) => word.as_str(),
                None => return Err(self.error(line, "missing value for command")),
                _ => "",
            };

            match keyword {
                "end" => {
                    self.expect_no_args(line, "end", &tokens)?;
                    return Ok((nodes, Terminator::End));
                }
                "else" => {
                    return Ok((
                        nodes,
                        Terminator::Else {
                            line,
                            tokens: tokens[1..].to_vec(),
                        },
                    ));
                }
                "if" => nodes.push(self.parse_conditional(line, &tokens[1..], "if")?),
                "with" => nodes.push(self.parse_conditional(line, &tokens[1..], "with")?),
                "range" => nodes.push(self.parse_range(line, &tokens[1..])?),
                "template" => nodes.push(self.parse_template_call(line, &tokens[1..])?),
                "define" => self.parse_define(line, &tokens[1..])?,
                "block" => nodes.push(self.parse_block(line, &tokens[1..])?),
                "break" | "continue" => {
                    self.expect_no_args(line, keyword, &tokens)?;
                    if self.range_depth == 0 {
                        return Err(self.error(line, format!("{{{{{keyword}}}}} outside {{{{range}}}}")));
                    }
                    nodes.push(if keyword == "break" {
                        Node::Break {
                            line,
                        }
                    } else {
                        Node::Continue {
                            line,
                        }
                    });
                }
                _ => {
                    let pipe = self.parse_pipeline(line, &tokens, true)?;
                    nodes.push(Node::Action {
                        line,
                        pipe,
                    });
                }
            }
        }

        Ok((nodes, Terminator::Eof))
    }

    fn expect_no_args(&self, line: usize, keyword: &str, tokens: &[Token]) -> Result<(), TemplateError> {
        if tokens.len() > 1 {
            return Err(self.error(line, format!("unexpected arguments after {{{{{keyword}}}}}")));
        }
        Ok(())
    }

    fn expect_end(&self, line: usize, context: &str, terminator: Terminator) -> Result<(), TemplateError> {
        match terminator {
            Terminator::End => Ok(()),
            Terminator::Eof => Err(self.error(line, format!("unexpected EOF in {context}"))),
            Terminator::Else {
                line,
                ..
            } => Err(self.error(line, format!("unexpected {{{{else}}}} in {context}"))),
        }
    }

    /// `if` and `with`, including `else if` / `else with` chains.
    fn parse_conditional(
        &mut self,
        line: usize,
        tokens: &[Token],
        keyword: &str,
    ) -> Result<Node, TemplateError> {
        let context = format!("{{{{{keyword}}}}}");
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut tokens = tokens.to_vec();
        let mut branch_line = line;

        let scope = self.vars.len();
        loop {
            let pipe = self.parse_pipeline(branch_line, &tokens, true)?;
            let (body, terminator) = self.parse_nested_list()?;
            branches.push((pipe, body));

            match terminator {
                Terminator::End => break,
                Terminator::Eof => {
                    return Err(self.error(line, format!("unexpected EOF in {context}")));
                }
                Terminator::Else {
                    line: else_line,
                    tokens: rest,
                } => {
                    if rest.is_empty() {
                        let (body, terminator) = self.parse_nested_list()?;
                        self.expect_end(else_line, &context, terminator)?;
                        otherwise = Some(body);
                        break;
                    }
                    if !matches!(rest.first(), Some(Token::Ident(word)) if word == keyword) {
                        return Err(self.error(else_line, format!("unexpected arguments after {{{{else}}}} in {context}")));
                    }
                    tokens = rest[1..].to_vec();
                    branch_line = else_line;
                }
            }
        }
        self.vars.truncate(scope);

        Ok(if keyword == "if" {
            Node::If {
                line,
                branches,
                otherwise,
            }
        } else {
            Node::With {
                line,
                branches,
                otherwise,
            }
        })
    }

    fn parse_range(&mut self, line: usize, tokens: &[Token]) -> Result<Node, TemplateError> {
        let scope = self.vars.len();
        let pipe = self.parse_pipeline(line, tokens, true)?;
        if pipe.vars.len() > 2 {
            return Err(self.error(line, "too many declarations in range"));
        }

        self.range_depth += 1;
        let (body, terminator) = self.parse_nested_list()?;
        self.range_depth -= 1;

        let otherwise = match terminator {
            Terminator::End => None,
            Terminator::Eof => return Err(self.error(line, "unexpected EOF in {{range}}")),
            Terminator::Else {
                line: else_line,
                tokens: rest,
            } => {
                if !rest.is_empty() {
                    return Err(self.error(else_line, "unexpected arguments after {{else}} in {{range}}"));
                }
                let (body, terminator) = self.parse_nested_list()?;
                self.expect_end(else_line, "{{range}}", terminator)?;
                Some(body)
            }
        };
        self.vars.truncate(scope);

        Ok(Node::Range {
            line,
            pipe,
            body,
            otherwise,
        })
    }

    fn template_name(&self, line: usize, tokens: &[Token], keyword: &str) -> Result<String, TemplateError> {
        match tokens.first() {
            Some(Token::Str(name)) => Ok(name.clone()),
            _ => Err(self.error(line, format!("missing name in {{{{{keyword}}}}}, expected a string"))),
        }
    }

    fn parse_template_call(&mut self, line: usize, tokens: &[Token]) -> Result<Node, TemplateError> {
        let name = self.template_name(line, tokens, "template")?;
        let pipe = if tokens.len() > 1 {
            Some(self.parse_pipeline(line, &tokens[1..], false)?)
        } else {
            None
        };
        Ok(Node::Template {
            line,
            name,
            pipe,
        })
    }

    /// Parses the body of an `if`, `with` or `range`, where `define` is not allowed.
    fn parse_nested_list(&mut self) -> Result<(Vec<Node>, Terminator), TemplateError> {
        let saved_top = std::mem::replace(&mut self.top_level, false);
        let result = self.parse_list();
        self.top_level = saved_top;
        result
    }

    /// Parses a nested body with a fresh variable scope holding only `$`.
    fn parse_definition_body(&mut self, line: usize, keyword: &str) -> Result<Vec<Node>, TemplateError> {
        let saved_vars = std::mem::replace(&mut self.vars, vec![String::new()]);
        let saved_range = std::mem::replace(&mut self.range_depth, 0);
        let saved_top = std::mem::replace(&mut self.top_level, false);

        let result = self.parse_list();

        self.vars = saved_vars;
        self.range_depth = saved_range;
        self.top_level = saved_top;

        let (body, terminator) = result?;
        self.expect_end(line, &format!("{{{{{keyword}}}}}"), terminator)?;
        Ok(body)
    }

    fn parse_define(&mut self, line: usize, tokens: &[Token]) -> Result<(), TemplateError> {
        if !self.top_level {
            return Err(self.error(line, "{{define}} is only allowed at the top level"));
        }
        let name = self.template_name(line, tokens, "define")?;
        if tokens.len() > 1 {
            return Err(self.error(line, "unexpected arguments in {{define}}"));
        }
        let body = self.parse_definition_body(line, "define")?;
        self.defines.push((name, body));
        Ok(())
    }

    fn parse_block(&mut self, line: usize, tokens: &[Token]) -> Result<Node, TemplateError> {
        let name = self.template_name(line, tokens, "block")?;
        if tokens.len() < 2 {
            return Err(self.error(line, "missing pipeline in {{block}}"));
        }
        let pipe = self.parse_pipeline(line, &tokens[1..], false)?;
        let body = self.parse_definition_body(line, "block")?;
        self.defines.push((name.clone(), body));
        Ok(Node::Template {
            line,
            name,
            pipe: Some(pipe),
        })
    }

    fn parse_pipeline(
        &mut self,
        line: usize,
        tokens: &[Token],
        allow_decl: bool,
    ) -> Result<Pipeline, TemplateError> {
        let (vars, assign, rest) = self.split_declaration(line, tokens, allow_decl)?;
        if rest.is_empty() {
            return Err(self.error(line, "missing value for command"));
        }

        let mut commands = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, token) in rest.iter().enumerate() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error(line, "unexpected right paren"))?;
                }
                Token::Pipe if depth == 0 => {
                    commands.push(self.parse_command(line, &rest[start..i])?);
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(self.error(line, "unclosed left paren"));
        }
        commands.push(self.parse_command(line, &rest[start..])?);

        for (stage, command) in commands.iter().enumerate().skip(1) {
            if !matches!(command.args.first(), Some(Operand::Function(_))) {
                return Err(self.error(
                    line,
                    format!("non executable command in pipeline stage {}", stage + 1),
                ));
            }
        }

        // Declared names become visible after the pipeline itself
        if !assign {
            self.vars.extend(vars.iter().cloned());
        }

        Ok(Pipeline {
            vars,
            assign,
            commands,
        })
    }

    fn split_declaration<'t>(
        &self,
        line: usize,
        tokens: &'t [Token],
        allow_decl: bool,
    ) -> Result<(Vec<String>, bool, &'t [Token]), TemplateError> {
        let decl_at = tokens
            .iter()
            .position(|t| matches!(t, Token::Declare | Token::Assign));
        let Some(pos) = decl_at else {
            return Ok((Vec::new(), false, tokens));
        };
        if !allow_decl {
            return Err(self.error(line, "variable declaration not allowed here"));
        }

        let assign = matches!(tokens[pos], Token::Assign);
        let mut vars = Vec::new();
        for (i, token) in tokens[..pos].iter().enumerate() {
            match token {
                Token::Var(name, fields) if fields.is_empty() && i % 2 == 0 => vars.push(name.clone()),
                Token::Comma if i % 2 == 1 => {}
                _ => return Err(self.error(line, "unexpected token in variable declaration")),
            }
        }
        if vars.is_empty() || tokens[..pos].len() % 2 == 0 {
            return Err(self.error(line, "missing variable in declaration"));
        }
        if assign {
            for var in &vars {
                if !self.vars.contains(var) {
                    return Err(self.error(line, format!("undefined variable \"${var}\"")));
                }
            }
        }
        Ok((vars, assign, &tokens[pos + 1..]))
    }

    fn parse_command(&mut self, line: usize, tokens: &[Token]) -> Result<Command, TemplateError> {
        if tokens.is_empty() {
            return Err(self.error(line, "missing value for command"));
        }

        let mut args = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let operand = match &tokens[i] {
                Token::Dot => Operand::Dot,
                Token::Field(fields) => Operand::Field(fields.clone()),
                Token::Str(s) => Operand::Str(s.clone()),
                Token::Int(n) => Operand::Int(*n),
                Token::Float(f) => Operand::Float(*f),
                Token::Var(name, fields) => {
                    if !self.vars.contains(name) {
                        return Err(self.error(line, format!("undefined variable \"${name}\"")));
                    }
                    Operand::Variable(name.clone(), fields.clone())
                }
                Token::Ident(word) => match word.as_str() {
                    "true" => Operand::Bool(true),
                    "false" => Operand::Bool(false),
                    "nil" => Operand::Nil,
                    name if self.functions.contains(name) => Operand::Function(name.to_string()),
                    name => {
                        return Err(self.error(line, format!("function \"{name}\" not defined")));
                    }
                },
                Token::LParen => {
                    let close = matching_paren(tokens, i)
                        .ok_or_else(|| self.error(line, "unclosed left paren"))?;
                    let inner = self.parse_pipeline(line, &tokens[i + 1..close], false)?;
                    i = close;
                    let chain = match tokens.get(close + 1) {
                        Some(Token::Chain(fields)) => {
                            i += 1;
                            fields.clone()
                        }
                        _ => Vec::new(),
                    };
                    Operand::Pipeline(Box::new(inner), chain)
                }
                other => return Err(self.error(line, format!("unexpected {} in operand", describe(other)))),
            };
            args.push(operand);
            i += 1;
        }

        if args.len() > 1 && args[0] == Operand::Nil {
            return Err(self.error(line, "nil is not a command"));
        }

        Ok(Command {
            args,
        })
    }
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn describe(token: &Token) -> &'static str {
    match token {
        Token::RParen => "')'",
        Token::Pipe => "'|'",
        Token::Comma => "','",
        Token::Declare => "':='",
        Token::Assign => "'='",
        Token::Chain(_) => "field chain",
        _ => "token",
    }
}
