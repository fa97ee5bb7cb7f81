//! Tree-walking executor.

use santa_types::{Result, SantaError};
use std::fmt::Write as _;

use crate::functions;
use crate::parser::{Command, Conditional, Node, Operand, Pipeline, RangeNode};
use crate::value::Value;

/// Largest integer `range` will count up to.
pub const MAX_RANGE_COUNT: i64 = 100_000;

enum Flow {
    Normal,
    Break,
    Continue,
}

/// Execute `nodes` against `root`, which is also the initial dot and `$`.
pub(crate) fn execute(nodes: &[Node], root: &Value) -> Result<String> {
    let mut state = State {
        out: String::new(),
        vars: vec![(String::new(), root.clone())],
    };
    state.walk(root, nodes)?;
    Ok(state.out)
}

struct State {
    out: String,
    vars: Vec<(String, Value)>,
}

fn exec_error(line: usize, msg: impl std::fmt::Display) -> SantaError {
    SantaError::TemplateExecution(format!("line {}: {}", line, msg))
}

fn path_label(prefix: &str, chain: &[String]) -> String {
    let mut label = prefix.to_string();
    for field in chain {
        label.push('.');
        label.push_str(field);
    }
    label
}

/// Resolve `chain` below `base`. Missing keys are errors.
fn resolve(base: &Value, chain: &[String], label: &str, line: usize) -> Result<Value> {
    let mut current = base;
    for field in chain {
        current = match current {
            Value::Map(map) => map.get(field).ok_or_else(|| {
                exec_error(line, format!("map has no entry for key \"{}\" in {}", field, label))
            })?,
            Value::Nil => {
                return Err(exec_error(line, format!("nil pointer evaluating {}", label)));
            }
            other => {
                return Err(exec_error(
                    line,
                    format!("can't evaluate field {} in type {} ({})", field, other.kind(), label),
                ));
            }
        };
    }
    Ok(current.clone())
}

impl State {
    fn walk(&mut self, dot: &Value, nodes: &[Node]) -> Result<Flow> {
        for node in nodes {
            let flow = match node {
                Node::Text(text) => {
                    self.out.push_str(text);
                    Flow::Normal
                }
                Node::Action(pipe) => {
                    let value = self.pipeline(dot, pipe)?;
                    if pipe.decl.is_empty() {
                        let _ = write!(self.out, "{}", value);
                    }
                    Flow::Normal
                }
                Node::If(cond) => self.conditional(dot, cond, false)?,
                Node::With(cond) => self.conditional(dot, cond, true)?,
                Node::Range(range) => self.range(dot, range)?,
                Node::Break => Flow::Break,
                Node::Continue => Flow::Continue,
            };
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn conditional(&mut self, dot: &Value, cond: &Conditional, rebinds_dot: bool) -> Result<Flow> {
        let mark = self.vars.len();
        let mut flow = None;
        for (pipe, body) in &cond.branches {
            let value = self.pipeline(dot, pipe)?;
            if value.is_truthy() {
                let next_dot = if rebinds_dot { &value } else { dot };
                flow = Some(self.walk(next_dot, body)?);
                break;
            }
        }
        let flow = match flow {
            Some(flow) => flow,
            None => self.walk(dot, &cond.else_body)?,
        };
        self.vars.truncate(mark);
        Ok(flow)
    }

    fn range(&mut self, dot: &Value, range: &RangeNode) -> Result<Flow> {
        let mark = self.vars.len();
        let line = range.pipe.line;
        let value = self.commands(dot, &range.pipe.commands, line)?;

        let items: Vec<(Value, Value)> = match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::Int(i as i64), item))
                .collect(),
            Value::Map(map) => map.into_iter().map(|(k, v)| (Value::Str(k), v)).collect(),
            Value::Int(n) if n > MAX_RANGE_COUNT => {
                return Err(exec_error(
                    line,
                    format!("range count {} exceeds {}", n, MAX_RANGE_COUNT),
                ));
            }
            Value::Int(n) => (0..n.max(0)).map(|i| (Value::Int(i), Value::Int(i))).collect(),
            Value::Nil => Vec::new(),
            other => {
                return Err(exec_error(line, format!("range can't iterate over {}", other.kind())));
            }
        };

        if items.is_empty() {
            let flow = self.walk(dot, &range.else_body)?;
            self.vars.truncate(mark);
            return Ok(flow);
        }

        for (key, item) in items {
            match range.pipe.decl.as_slice() {
                [elem] => self.vars.push((elem.clone(), item.clone())),
                [key_name, elem] => {
                    self.vars.push((key_name.clone(), key));
                    self.vars.push((elem.clone(), item.clone()));
                }
                _ => {}
            }
            let flow = self.walk(&item, &range.body)?;
            self.vars.truncate(mark);
            if matches!(flow, Flow::Break) {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    fn pipeline(&mut self, dot: &Value, pipe: &Pipeline) -> Result<Value> {
        let value = self.commands(dot, &pipe.commands, pipe.line)?;
        if pipe.is_assign {
            if let Some(slot) = self.vars.iter_mut().rev().find(|(name, _)| *name == pipe.decl[0]) {
                slot.1 = value.clone();
            }
        } else {
            for name in &pipe.decl {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    fn commands(&mut self, dot: &Value, commands: &[Command], line: usize) -> Result<Value> {
        let mut piped = None;
        for command in commands {
            piped = Some(self.command(dot, command, piped, line)?);
        }
        Ok(piped.unwrap_or_default())
    }

    fn command(&mut self, dot: &Value, command: &Command, piped: Option<Value>, line: usize) -> Result<Value> {
        match command.args.as_slice() {
            [Operand::Func(name), rest @ ..] => {
                let mut args = Vec::with_capacity(rest.len() + 1);
                for operand in rest {
                    args.push(self.operand(dot, operand, line)?);
                }
                args.extend(piped);
                self.call(name, &args, line)
            }
            [single] => self.operand(dot, single, line),
            _ => Err(exec_error(line, "can't give argument to non-function")),
        }
    }

    fn call(&mut self, name: &str, args: &[Value], line: usize) -> Result<Value> {
        let func = functions::lookup(name)
            .ok_or_else(|| exec_error(line, format!("function \"{}\" not defined", name)))?;
        func(args).map_err(|msg| exec_error(line, format!("error calling {}: {}", name, msg)))
    }

    fn variable(&self, name: &str, line: usize) -> Result<&Value> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, value)| value)
            .ok_or_else(|| exec_error(line, format!("undefined variable \"${}\"", name)))
    }

    fn operand(&mut self, dot: &Value, operand: &Operand, line: usize) -> Result<Value> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(chain) => resolve(dot, chain, &path_label("", chain), line),
            Operand::Var(name, chain) => {
                let label = path_label(&format!("${}", name), chain);
                resolve(self.variable(name, line)?, chain, &label, line)
            }
            Operand::Func(name) => self.call(name, &[], line),
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Sub(pipe, chain) => {
                let value = self.pipeline(dot, pipe)?;
                resolve(&value, chain, &path_label("(...)", chain), line)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use serde_json::json;

    fn run(src: &str, data: serde_json::Value) -> Result<String> {
        let nodes = parse(tokenize(src)?)?;
        execute(&nodes, &Value::from(data))
    }

    #[test]
    fn test_fields_and_pipes() {
        let data = json!({"DB": {"password": "s3cret", "port": "5432"}});
        assert_eq!(
            run("pw={{ .DB.password | upper }} port={{ .DB.port }}", data).unwrap(),
            "pw=S3CRET port=5432"
        );
    }

    #[test]
    fn test_missing_key_is_error() {
        let err = run("a\n{{ .DB.nope }}", json!({"DB": {"x": "1"}})).unwrap_err();
        let SantaError::TemplateExecution(msg) = err else {
            panic!("expected execution error");
        };
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("\"nope\""), "{}", msg);
        assert!(msg.contains(".DB.nope"), "{}", msg);
    }

    #[test]
    fn test_conditionals() {
        let src = "{{ if .A }}a{{ else if .B }}b{{ else }}c{{ end }}";
        assert_eq!(run(src, json!({"A": "", "B": "x"})).unwrap(), "b");
        assert_eq!(run(src, json!({"A": "", "B": ""})).unwrap(), "c");
        let with = "{{ with .M.k }}[{{ . }}]{{ else }}none{{ end }}";
        assert_eq!(run(with, json!({"M": {"k": "v"}})).unwrap(), "[v]");
        assert_eq!(run(with, json!({"M": {"k": ""}})).unwrap(), "none");
    }

    #[test]
    fn test_range_forms() {
        let data = json!({"L": ["a", "b", "c"], "M": {"y": "2", "x": "1"}, "E": []});
        assert_eq!(
            run("{{ range $i, $v := .L }}{{ $i }}={{ $v }};{{ end }}", data.clone()).unwrap(),
            "0=a;1=b;2=c;"
        );
        assert_eq!(
            run("{{ range $k, $v := .M }}{{ $k }}{{ $v }}{{ end }}", data.clone()).unwrap(),
            "x1y2"
        );
        assert_eq!(run("{{ range .E }}x{{ else }}empty{{ end }}", data.clone()).unwrap(), "empty");
        assert_eq!(
            run("{{ range .L }}{{ if eq . \"b\" }}{{ continue }}{{ end }}{{ if eq . \"c\" }}{{ break }}{{ end }}{{ . }}{{ end }}", data.clone()).unwrap(),
            "a"
        );
        assert_eq!(run("{{ range 3 }}{{ . }}{{ end }}", data).unwrap(), "012");
    }

    #[test]
    fn test_range_count_limit() {
        let err = run("{{ range 9223372036854775807 }}x{{ end }}", json!({})).unwrap_err();
        assert!(
            matches!(err, SantaError::TemplateExecution(ref m) if m.contains("range count 9223372036854775807 exceeds 100000")),
            "{}",
            err
        );
        let out = run("{{ range $i := 100000 }}{{ end }}done", json!({})).unwrap();
        assert_eq!(out, "done");
        assert_eq!(run("{{ range -5 }}x{{ else }}none{{ end }}", json!({})).unwrap(), "none");
    }

    #[test]
    fn test_variables_and_root() {
        let data = json!({"A": {"v": "1"}, "B": {"v": "2"}});
        let src = "{{ $x := .A.v }}{{ with .B }}{{ $x }}{{ .v }}{{ $.A.v }}{{ end }}{{ $x = \"z\" }}{{ $x }}";
        assert_eq!(run(src, data).unwrap(), "121z");
    }

    #[test]
    fn test_parenthesized_and_function_errors() {
        let data = json!({"A": {"n": "7"}});
        assert_eq!(
            run("{{ printf \"%d-%s\" (add 1 .A.n) (lower \"X\") }}", data.clone()).unwrap(),
            "8-x"
        );
        let err = run("{{ div 1 0 }}", data.clone()).unwrap_err();
        assert!(err.to_string().contains("error calling div: division by zero"));
        let err = run("{{ range .A.n }}{{ end }}", data).unwrap_err();
        assert!(err.to_string().contains("range can't iterate over string"));
    }

    #[test]
    fn test_nil_value_prints_placeholder() {
        assert_eq!(run("{{ .A }}", json!({"A": null})).unwrap(), "<no value>");
    }
}
