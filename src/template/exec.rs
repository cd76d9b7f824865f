//! Tree-walking execution of compiled templates.

use serde_json::Value;

use super::funcs::{FuncKind, FuncSpec};
use super::parse::{Command, Node, Operand, Pipeline};
use super::value::{self, truthy};
use super::{Registry, TemplateError};
use crate::constants::MAX_TEMPLATE_DEPTH;

static NULL: Value = Value::Null;

fn quoted_list(names: &[&str]) -> String {
    names.iter().map(|n| format!("\"{n}\"")).collect::<Vec<_>>().join(", ")
}

/// How a list of nodes finished.
enum Flow {
    Normal,
    Break,
    Continue,
}

/// Execution state for one top-level render, shared by every nested
/// `template` and `include` call it makes.
pub struct Executor<'a> {
    registry: &'a Registry,
    /// Variables in scope, innermost last; `""` is `$`
    vars: Vec<(String, Value)>,
    depth: usize,
    name: String,
    line: usize,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            vars: Vec::new(),
            depth: 0,
            name: String::new(),
            line: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Exec {
            name: self.name.clone(),
            line: self.line,
            message: message.into(),
        }
    }

    /// Renders another template with `data` as dot, as `include` does.
    pub fn include(&mut self, name: &str, data: &Value) -> Result<String, TemplateError> {
        self.run_template(name, data)
    }

    pub(crate) fn run_template(&mut self, name: &str, data: &Value) -> Result<String, TemplateError> {
        if self.depth > MAX_TEMPLATE_DEPTH {
            return Err(self.error(format!(
                "exceeded maximum template depth ({MAX_TEMPLATE_DEPTH}) calling \"{name}\""
            )));
        }
        let registry: &'a Registry = self.registry;
        let Some((resolved, body)) = registry.resolve(name) else {
            let similar = registry.similar_names(name);
            let message = if similar.is_empty() {
                format!("no such template \"{name}\"")
            } else {
                format!("no such template \"{name}\" (did you mean {})", quoted_list(&similar))
            };
            return Err(self.error(message));
        };

        // Each template starts with only `$` in scope
        let saved_vars = std::mem::replace(&mut self.vars, vec![(String::new(), data.clone())]);
        let saved_name = std::mem::replace(&mut self.name, resolved.to_string());
        let saved_line = self.line;
        self.depth += 1;

        let mut out = String::new();
        let result = self.exec_list(body, data, &mut out);

        self.depth -= 1;
        self.vars = saved_vars;
        self.name = saved_name;
        self.line = saved_line;

        result.map(|_| out)
    }

    fn exec_list(&mut self, nodes: &'a [Node], dot: &Value, out: &mut String) -> Result<Flow, TemplateError> {
        for node in nodes {
            match self.exec_node(node, dot, out)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Runs a nested body, dropping the variables it declared afterwards.
    fn exec_scoped(&mut self, nodes: &'a [Node], dot: &Value, out: &mut String) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        let flow = self.exec_list(nodes, dot, out);
        self.vars.truncate(mark);
        flow
    }

    fn exec_node(&mut self, node: &'a Node, dot: &Value, out: &mut String) -> Result<Flow, TemplateError> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action {
                line,
                pipe,
            } => {
                self.line = *line;
                let result = self.eval_pipeline(pipe, dot)?;
                if pipe.vars.is_empty() {
                    out.push_str(&value::print_action(&result));
                }
            }
            Node::If {
                line,
                branches,
                otherwise,
            } => {
                self.line = *line;
                let mark = self.vars.len();
                let flow = self.exec_if(branches, otherwise.as_deref(), dot, out);
                self.vars.truncate(mark);
                return flow;
            }
            Node::With {
                line,
                branches,
                otherwise,
            } => {
                self.line = *line;
                let mark = self.vars.len();
                let flow = self.exec_with(branches, otherwise.as_deref(), dot, out);
                self.vars.truncate(mark);
                return flow;
            }
            Node::Range {
                line,
                pipe,
                body,
                otherwise,
            } => {
                self.line = *line;
                self.exec_range(pipe, body, otherwise.as_deref(), dot, out)?;
            }
            Node::Template {
                line,
                name,
                pipe,
            } => {
                self.line = *line;
                let data = match pipe {
                    Some(pipe) => self.eval_pipeline(pipe, dot)?,
                    None => Value::Null,
                };
                let text = self.run_template(name, &data)?;
                out.push_str(&text);
            }
            Node::Break {
                ..
            } => return Ok(Flow::Break),
            Node::Continue {
                ..
            } => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn exec_if(
        &mut self,
        branches: &'a [(Pipeline, Vec<Node>)],
        otherwise: Option<&'a [Node]>,
        dot: &Value,
        out: &mut String,
    ) -> Result<Flow, TemplateError> {
        for (pipe, body) in branches {
            if truthy(&self.eval_pipeline(pipe, dot)?) {
                return self.exec_scoped(body, dot, out);
            }
        }
        match otherwise {
            Some(body) => self.exec_scoped(body, dot, out),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_with(
        &mut self,
        branches: &'a [(Pipeline, Vec<Node>)],
        otherwise: Option<&'a [Node]>,
        dot: &Value,
        out: &mut String,
    ) -> Result<Flow, TemplateError> {
        for (pipe, body) in branches {
            let value = self.eval_pipeline(pipe, dot)?;
            if truthy(&value) {
                return self.exec_scoped(body, &value, out);
            }
        }
        match otherwise {
            Some(body) => self.exec_scoped(body, dot, out),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_range(
        &mut self,
        pipe: &'a Pipeline,
        body: &'a [Node],
        otherwise: Option<&'a [Node]>,
        dot: &Value,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let subject = self.eval_commands(&pipe.commands, dot)?;

        let items: Vec<(Value, Value)> = match &subject {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item.clone()))
                .collect(),
            Value::Object(map) => value::sorted_entries(map)
                .into_iter()
                .map(|(key, item)| (Value::String(key.clone()), item.clone()))
                .collect(),
            Value::Number(_) => match value::number(&subject) {
                Some(value::Num::Int(n)) => {
                    if pipe.vars.len() > 1 {
                        return Err(self.error("can't use two iteration variables with an integer"));
                    }
                    (0..n.max(0)).map(|i| (Value::from(i), Value::from(i))).collect()
                }
                _ => return Err(self.error(format!("range can't iterate over {}", value::format_value(&subject)))),
            },
            Value::Null => Vec::new(),
            other => {
                return Err(self.error(format!("range can't iterate over {}", value::format_value(other))));
            }
        };

        if items.is_empty() {
            if let Some(body) = otherwise {
                self.exec_scoped(body, dot, out)?;
            }
            return Ok(());
        }

        for (key, item) in items {
            let mark = self.vars.len();
            match pipe.vars.as_slice() {
                [] => {}
                [only] => self.set_loop_var(only, pipe.assign, item.clone())?,
                [first, second, ..] => {
                    self.set_loop_var(first, pipe.assign, key)?;
                    self.set_loop_var(second, pipe.assign, item.clone())?;
                }
            }
            let flow = self.exec_list(body, &item, out);
            self.vars.truncate(mark);
            if let Flow::Break = flow? {
                break;
            }
        }
        Ok(())
    }

    fn set_loop_var(&mut self, name: &str, assign: bool, value: Value) -> Result<(), TemplateError> {
        if assign {
            self.assign_var(name, value)
        } else {
            self.vars.push((name.to_string(), value));
            Ok(())
        }
    }

    fn assign_var(&mut self, name: &str, value: Value) -> Result<(), TemplateError> {
        match self.vars.iter_mut().rev().find(|(var, _)| var == name) {
            Some(slot) => {
                slot.1 = value;
                Ok(())
            }
            None => Err(self.error(format!("undefined variable: ${name}"))),
        }
    }

    fn lookup_var(&self, name: &str) -> Result<&Value, TemplateError> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, value)| value)
            .ok_or_else(|| self.error(format!("undefined variable: ${name}")))
    }

    fn eval_pipeline(&mut self, pipe: &'a Pipeline, dot: &Value) -> Result<Value, TemplateError> {
        let result = self.eval_commands(&pipe.commands, dot)?;
        for var in &pipe.vars {
            if pipe.assign {
                self.assign_var(var, result.clone())?;
            } else {
                self.vars.push((var.clone(), result.clone()));
            }
        }
        Ok(result)
    }

    fn eval_commands(&mut self, commands: &'a [Command], dot: &Value) -> Result<Value, TemplateError> {
        let mut last = None;
        for command in commands {
            last = Some(self.eval_command(command, dot, last)?);
        }
        Ok(last.unwrap_or(Value::Null))
    }

    fn eval_command(&mut self, command: &'a Command, dot: &Value, piped: Option<Value>) -> Result<Value, TemplateError> {
        let Some((first, rest)) = command.args.split_first() else {
            return Err(self.error("empty command"));
        };

        match first {
            Operand::Function(name) => self.call_function(name, rest, dot, piped),
            Operand::Nil => Err(self.error("nil is not a command")),
            operand => {
                if !rest.is_empty() || piped.is_some() {
                    return Err(self.error("can't give argument to non-function"));
                }
                self.eval_operand(operand, dot)
            }
        }
    }

    fn eval_operand(&mut self, operand: &'a Operand, dot: &Value) -> Result<Value, TemplateError> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Nil => Ok(Value::Null),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Str(s) => Ok(Value::String(s.clone())),
            Operand::Int(i) => Ok(Value::from(*i)),
            Operand::Float(f) => Ok(value::float(*f)),
            Operand::Field(fields) => self.walk_fields(dot, fields),
            Operand::Variable(name, fields) => self.walk_fields(self.lookup_var(name)?, fields),
            Operand::Function(name) => self.call_function(name, &[], dot, None),
            Operand::Pipeline(pipe, fields) => {
                let base = self.eval_pipeline(pipe, dot)?;
                self.walk_fields(&base, fields)
            }
        }
    }

    /// Follows a field chain. Missing keys and fields of nil are nil.
    fn walk_fields(&self, base: &Value, fields: &[String]) -> Result<Value, TemplateError> {
        let mut current = base;
        for field in fields {
            current = match current {
                Value::Object(map) => map.get(field).unwrap_or(&NULL),
                Value::Null => &NULL,
                other => {
                    return Err(self.error(format!(
                        "can't evaluate field {field} in type {}",
                        value::kind(other)
                    )));
                }
            };
        }
        Ok(current.clone())
    }

    fn call_function(
        &mut self,
        name: &str,
        operands: &'a [Operand],
        dot: &Value,
        piped: Option<Value>,
    ) -> Result<Value, TemplateError> {
        let registry: &'a Registry = self.registry;
        let Some(spec) = registry.library().get(name) else {
            return Err(self.error(format!("function \"{name}\" not defined")));
        };

        let given = operands.len() + usize::from(piped.is_some());
        if !spec.arity.accepts(given) {
            return Err(self.error(format!(
                "wrong number of args for {name}: want {} got {given}",
                spec.arity
            )));
        }

        if matches!(name, "and" | "or") {
            return self.short_circuit(name == "and", operands, dot, piped);
        }

        let mut args = Vec::with_capacity(given);
        for operand in operands {
            args.push(self.eval_operand(operand, dot)?);
        }
        args.extend(piped);

        self.invoke(spec, &args)
    }

    fn invoke(&mut self, spec: &FuncSpec, args: &[Value]) -> Result<Value, TemplateError> {
        let result = match spec.kind {
            FuncKind::Pure(f) => f(args),
            FuncKind::Engine(f) => f(self, args),
        };
        result.map_err(|err| match err.downcast::<TemplateError>() {
            Ok(inner) => inner,
            Err(err) => self.error(format!("error calling {}: {err:#}", spec.name)),
        })
    }

    /// `and` / `or`: stops evaluating at the first falsy / truthy argument.
    fn short_circuit(
        &mut self,
        is_and: bool,
        operands: &'a [Operand],
        dot: &Value,
        piped: Option<Value>,
    ) -> Result<Value, TemplateError> {
        let mut last = Value::Null;
        for operand in operands {
            last = self.eval_operand(operand, dot)?;
            if truthy(&last) != is_and {
                return Ok(last);
            }
        }
        if let Some(piped) = piped {
            last = piped;
        }
        Ok(last)
    }
}
