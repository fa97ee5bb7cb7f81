//! Parser producing the template syntax tree.
//!
//! Besides structure, the parser enforces what can be checked statically:
//! functions must exist, variables must be declared before use,
//! `break`/`continue` must sit inside `range`, and nesting is bounded.

use santa_types::{Result, SantaError};

use crate::functions;
use crate::lexer::{Spanned, Token};
use crate::value::Value;

/// Deepest allowed nesting of blocks and parenthesised pipelines.
pub const MAX_NESTING: usize = 100;

/// One node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text
    Text(String),
    /// `{{ pipeline }}`
    Action(Pipeline),
    /// `{{if}} … {{else if}} … {{else}} … {{end}}`
    If(Conditional),
    /// `{{with}} … {{else with}} … {{else}} … {{end}}`
    With(Conditional),
    /// `{{range}} … {{else}} … {{end}}`
    Range(RangeNode),
    /// `{{break}}`
    Break,
    /// `{{continue}}`
    Continue,
}

/// Branch chain shared by `if` and `with`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// Condition and body of each branch, in order
    pub branches: Vec<(Pipeline, Vec<Node>)>,
    /// Final `{{else}}` body (possibly empty)
    pub else_body: Vec<Node>,
}

/// A `range` block.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeNode {
    /// Iterated pipeline; its declarations name the key/index and element
    pub pipe: Pipeline,
    /// Loop body
    pub body: Vec<Node>,
    /// Body run when there is nothing to iterate
    pub else_body: Vec<Node>,
}

/// Commands joined by `|`, with an optional variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Source line
    pub line: usize,
    /// Declared or assigned variable names (without `$`)
    pub decl: Vec<String>,
    /// `=` rather than `:=`
    pub is_assign: bool,
    /// Pipeline stages
    pub commands: Vec<Command>,
}

/// One pipeline stage: a function with arguments, or a single operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Operands; the first is the function for calls
    pub args: Vec<Operand>,
}

/// A command operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.`
    Dot,
    /// `.A.b`
    Field(Vec<String>),
    /// `$x.a` (`$` is the empty name)
    Var(String, Vec<String>),
    /// Function name
    Func(String),
    /// Literal constant
    Literal(Value),
    /// `(pipeline).a.b`
    Sub(Box<Pipeline>, Vec<String>),
}

/// Where a list of nodes stopped.
enum Stop {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
    ElseWith(Pipeline),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    If,
    With,
}

impl Block {
    fn name(&self) -> &'static str {
        match self {
            Block::If => "if",
            Block::With => "with",
        }
    }
}

/// Parse a token stream into nodes.
pub fn parse(tokens: Vec<Spanned>) -> Result<Vec<Node>> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        vars: Vec::new(),
        range_depth: 0,
        depth: 0,
    };
    let (nodes, stop) = parser.list()?;
    match stop {
        Stop::Eof => Ok(nodes),
        Stop::End => Err(parser.error("unexpected {{end}}")),
        _ => Err(parser.error("unexpected {{else}}")),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    vars: Vec<String>,
    range_depth: usize,
    depth: usize,
}

impl Parser {
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn error(&self, msg: impl std::fmt::Display) -> SantaError {
        SantaError::TemplateSyntax(format!("line {}: {}", self.line(), msg))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_close(&mut self, context: &str) -> Result<()> {
        match self.next() {
            Some(Token::Close) => Ok(()),
            Some(other) => Err(self.error(format!("unexpected {:?} in {}", other, context))),
            None => Err(self.error(format!("unclosed action in {}", context))),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_NESTING)));
        }
        Ok(())
    }

    fn list(&mut self) -> Result<(Vec<Node>, Stop)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Open => match self.action()? {
                    Ok(node) => nodes.push(node),
                    Err(stop) => return Ok((nodes, stop)),
                },
                other => return Err(self.error(format!("unexpected {:?}", other))),
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Parse one action; `Err(stop)` when it ends the enclosing list.
    fn action(&mut self) -> Result<std::result::Result<Node, Stop>> {
        let keyword = match self.peek() {
            Some(Token::Ident(word)) => word.clone(),
            _ => String::new(),
        };
        match keyword.as_str() {
            "if" => {
                self.pos += 1;
                self.conditional(Block::If).map(|c| Ok(Node::If(c)))
            }
            "with" => {
                self.pos += 1;
                self.conditional(Block::With).map(|c| Ok(Node::With(c)))
            }
            "range" => {
                self.pos += 1;
                self.range().map(|r| Ok(Node::Range(r)))
            }
            "end" => {
                self.pos += 1;
                self.expect_close("end")?;
                Ok(Err(Stop::End))
            }
            "else" => {
                self.pos += 1;
                match self.peek() {
                    Some(Token::Ident(word)) if word == "if" => {
                        self.pos += 1;
                        Ok(Err(Stop::ElseIf(self.pipeline_with_decl("if")?)))
                    }
                    Some(Token::Ident(word)) if word == "with" => {
                        self.pos += 1;
                        Ok(Err(Stop::ElseWith(self.pipeline_with_decl("with")?)))
                    }
                    _ => {
                        self.expect_close("else")?;
                        Ok(Err(Stop::Else))
                    }
                }
            }
            "break" | "continue" => {
                self.pos += 1;
                if self.range_depth == 0 {
                    return Err(self.error(format!("{{{{{}}}}} outside {{{{range}}}}", keyword)));
                }
                self.expect_close(&keyword)?;
                Ok(Ok(if keyword == "break" { Node::Break } else { Node::Continue }))
            }
            "define" | "template" | "block" => {
                Err(self.error(format!("{{{{{}}}}} is not supported", keyword)))
            }
            _ => {
                let pipe = self.pipeline(true, "command")?;
                self.expect_close("command")?;
                Ok(Ok(Node::Action(pipe)))
            }
        }
    }

    fn pipeline_with_decl(&mut self, context: &str) -> Result<Pipeline> {
        let pipe = self.pipeline(true, context)?;
        self.expect_close(context)?;
        Ok(pipe)
    }

    fn conditional(&mut self, block: Block) -> Result<Conditional> {
        self.enter()?;
        let mark = self.vars.len();
        let first = self.pipeline_with_decl(block.name())?;

        let mut branches = Vec::new();
        let (body, mut stop) = self.list()?;
        branches.push((first, body));
        let mut else_body = Vec::new();
        loop {
            match stop {
                Stop::End => break,
                Stop::Else => {
                    let (body, next) = self.list()?;
                    if !matches!(next, Stop::End) {
                        return Err(self.error(format!("expected {{{{end}}}} after {{{{else}}}} in {}", block.name())));
                    }
                    else_body = body;
                    break;
                }
                Stop::ElseIf(pipe) if block == Block::If => {
                    let (body, next) = self.list()?;
                    branches.push((pipe, body));
                    stop = next;
                }
                Stop::ElseWith(pipe) if block == Block::With => {
                    let (body, next) = self.list()?;
                    branches.push((pipe, body));
                    stop = next;
                }
                Stop::ElseIf(_) | Stop::ElseWith(_) => {
                    return Err(self.error(format!("mismatched {{{{else}}}} chain in {}", block.name())));
                }
                Stop::Eof => {
                    return Err(self.error(format!("unexpected EOF: missing {{{{end}}}} for {}", block.name())));
                }
            }
        }
        self.vars.truncate(mark);
        self.depth -= 1;
        Ok(Conditional { branches, else_body })
    }

    fn range(&mut self) -> Result<RangeNode> {
        self.enter()?;
        let mark = self.vars.len();
        let pipe = self.pipeline_with_decl("range")?;
        if pipe.decl.len() > 2 {
            return Err(self.error("too many declarations in range"));
        }

        self.range_depth += 1;
        let (body, stop) = self.list()?;
        self.range_depth -= 1;

        let else_body = match stop {
            Stop::End => Vec::new(),
            Stop::Else => {
                let (body, next) = self.list()?;
                if !matches!(next, Stop::End) {
                    return Err(self.error("expected {{end}} after {{else}} in range"));
                }
                body
            }
            Stop::Eof => return Err(self.error("unexpected EOF: missing {{end}} for range")),
            Stop::ElseIf(_) | Stop::ElseWith(_) => {
                return Err(self.error("{{else if}} and {{else with}} are not allowed in range"))
            }
        };
        self.vars.truncate(mark);
        self.depth -= 1;
        Ok(RangeNode { pipe, body, else_body })
    }

    fn declaration(&mut self) -> Option<(Vec<String>, bool)> {
        let first = match self.peek() {
            Some(Token::Var(name, fields)) if !name.is_empty() && fields.is_empty() => name.clone(),
            _ => return None,
        };
        match self.peek_at(1) {
            Some(Token::Declare) => {
                self.pos += 2;
                Some((vec![first], false))
            }
            Some(Token::Assign) => {
                self.pos += 2;
                Some((vec![first], true))
            }
            Some(Token::Comma) => match (self.peek_at(2), self.peek_at(3)) {
                (Some(Token::Var(second, fields)), Some(Token::Declare))
                    if !second.is_empty() && fields.is_empty() =>
                {
                    let second = second.clone();
                    self.pos += 4;
                    Some((vec![first, second], false))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn pipeline(&mut self, allow_decl: bool, context: &str) -> Result<Pipeline> {
        let line = self.line();
        let (decl, is_assign) = if allow_decl {
            self.declaration().unwrap_or_default()
        } else {
            (Vec::new(), false)
        };
        if is_assign && !self.vars.contains(&decl[0]) {
            return Err(self.error(format!("undefined variable \"${}\"", decl[0])));
        }

        let mut commands = Vec::new();
        loop {
            let stage = commands.len();
            let command = self.command(stage)?;
            commands.push(command);
            if matches!(self.peek(), Some(Token::Pipe)) {
                self.pos += 1;
                continue;
            }
            break;
        }
        if commands.is_empty() {
            return Err(self.error(format!("missing value for {}", context)));
        }

        if !is_assign {
            self.vars.extend(decl.iter().cloned());
        }
        Ok(Pipeline {
            line,
            decl,
            is_assign,
            commands,
        })
    }

    fn command(&mut self, stage: usize) -> Result<Command> {
        let mut args = Vec::new();
        while !matches!(
            self.peek(),
            None | Some(Token::Pipe) | Some(Token::Close) | Some(Token::RParen)
        ) {
            args.push(self.operand()?);
        }

        let Some(first) = args.first() else {
            return Err(self.error("missing value for command"));
        };
        let is_func = matches!(first, Operand::Func(_));
        if stage > 0 && !is_func {
            return Err(self.error(format!("non executable command in pipeline stage {}", stage + 1)));
        }
        if !is_func && args.len() > 1 {
            return Err(self.error("can't give argument to non-function"));
        }
        if matches!(first, Operand::Literal(Value::Nil)) && args.len() == 1 {
            return Err(self.error("nil is not a command"));
        }
        Ok(Command { args })
    }

    fn operand(&mut self) -> Result<Operand> {
        let token = self.next().ok_or_else(|| self.error("unexpected end of action"))?;
        Ok(match token {
            Token::Dot => Operand::Dot,
            Token::Field(chain) => Operand::Field(chain),
            Token::Var(name, chain) => {
                if !name.is_empty() && !self.vars.contains(&name) {
                    return Err(self.error(format!("undefined variable \"${}\"", name)));
                }
                Operand::Var(name, chain)
            }
            Token::Ident(name) => {
                if !functions::exists(&name) {
                    return Err(self.error(format!("function \"{}\" not defined", name)));
                }
                Operand::Func(name)
            }
            Token::Str(s) => Operand::Literal(Value::Str(s)),
            Token::Int(i) => Operand::Literal(Value::Int(i)),
            Token::Float(f) => Operand::Literal(Value::Float(f)),
            Token::Bool(b) => Operand::Literal(Value::Bool(b)),
            Token::Nil => Operand::Literal(Value::Nil),
            Token::LParen => {
                self.enter()?;
                let inner = self.pipeline(false, "parenthesized pipeline")?;
                match self.next() {
                    Some(Token::RParen) => {}
                    _ => return Err(self.error("unclosed left paren")),
                }
                self.depth -= 1;
                let chain = match self.peek() {
                    Some(Token::Chain(chain)) => {
                        let chain = chain.clone();
                        self.pos += 1;
                        chain
                    }
                    _ => Vec::new(),
                };
                Operand::Sub(Box::new(inner), chain)
            }
            other => return Err(self.error(format!("unexpected {:?} in operand", other))),
        })
    }
}
