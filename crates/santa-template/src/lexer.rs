//! Tokenizer for template source.
//!
//! Text outside `{{ }}` becomes [`Token::Text`]; action contents become
//! structured tokens. Trim markers (`{{- ` and ` -}}`) are applied here by
//! trimming the adjacent text, and comments are dropped entirely.

use santa_types::{Result, SantaError};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text between actions
    Text(String),
    /// `{{`
    Open,
    /// `}}`
    Close,
    /// Keyword or function name
    Ident(String),
    /// `.` on its own
    Dot,
    /// `.A.b` field chain starting at dot
    Field(Vec<String>),
    /// `.a.b` chain applied to a parenthesised result
    Chain(Vec<String>),
    /// `$name` (empty for `$`) with an optional field chain
    Var(String, Vec<String>),
    /// String literal, escapes resolved
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// `true` / `false`
    Bool(bool),
    /// `nil`
    Nil,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `|`
    Pipe,
    /// `:=`
    Declare,
    /// `=`
    Assign,
    /// `,`
    Comma,
}

/// A token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// Token
    pub token: Token,
    /// Source line
    pub line: usize,
}

fn syntax(line: usize, msg: impl std::fmt::Display) -> SantaError {
    SantaError::TemplateSyntax(format!("line {}: {}", line, msg))
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    tokens: Vec<Spanned>,
    trim_next_text: bool,
}

/// Tokenize `src`.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        line: 1,
        tokens: Vec::new(),
        trim_next_text: false,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn push(&mut self, token: Token, line: usize) {
        self.tokens.push(Spanned { token, line });
    }

    fn run(&mut self) -> Result<()> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            let text_len = rest.find(OPEN).unwrap_or(rest.len());
            let mut text = &rest[..text_len];

            let trim_left = rest[text_len..].starts_with("{{-")
                && rest[text_len + 3..].starts_with(|c: char| c.is_ascii_whitespace());
            if self.trim_next_text {
                text = text.trim_start();
            }
            if trim_left {
                text = text.trim_end();
            }
            self.trim_next_text = false;

            let line = self.line;
            if !text.is_empty() {
                self.push(Token::Text(text.to_string()), line);
            }
            let text_end = self.pos + text_len;
            while self.pos < text_end {
                self.bump();
            }
            if self.pos >= self.src.len() {
                break;
            }

            self.pos += OPEN.len();
            if trim_left {
                self.pos += 1;
            }
            self.lex_action()?;
        }
        Ok(())
    }

    /// Lex one action after its opening delimiter, through `}}`.
    fn lex_action(&mut self) -> Result<()> {
        let open_line = self.line;
        self.skip_space();
        if self.rest().starts_with("/*") {
            return self.lex_comment(open_line);
        }

        self.push(Token::Open, open_line);
        loop {
            let had_space = self.skip_space();
            let line = self.line;
            let rest = self.rest();
            if rest.starts_with(CLOSE) {
                self.pos += CLOSE.len();
                self.push(Token::Close, line);
                return Ok(());
            }
            if had_space && rest.starts_with("-}}") {
                self.pos += 3;
                self.trim_next_text = true;
                self.push(Token::Close, line);
                return Ok(());
            }

            let Some(c) = self.peek() else {
                return Err(syntax(open_line, "unclosed action"));
            };
            match c {
                '(' => {
                    self.bump();
                    self.push(Token::LParen, line);
                }
                ')' => {
                    self.bump();
                    self.push(Token::RParen, line);
                    if self.rest().starts_with('.') && self.starts_ident_at(1) {
                        let chain = self.field_chain()?;
                        self.push(Token::Chain(chain), line);
                    }
                }
                '|' => {
                    self.bump();
                    self.push(Token::Pipe, line);
                }
                ',' => {
                    self.bump();
                    self.push(Token::Comma, line);
                }
                ':' => {
                    self.bump();
                    if self.peek() != Some('=') {
                        return Err(syntax(line, "expected :="));
                    }
                    self.bump();
                    self.push(Token::Declare, line);
                }
                '=' => {
                    self.bump();
                    self.push(Token::Assign, line);
                }
                '"' => {
                    let s = self.quoted_string()?;
                    self.push(Token::Str(s), line);
                }
                '`' => {
                    let s = self.raw_string()?;
                    self.push(Token::Str(s), line);
                }
                '\'' => {
                    let c = self.char_constant()?;
                    self.push(Token::Int(c as i64), line);
                }
                '.' => {
                    if self.starts_ident_at(1) {
                        let chain = self.field_chain()?;
                        self.push(Token::Field(chain), line);
                    } else if self.rest()[1..].starts_with(|c: char| c.is_ascii_digit()) {
                        let token = self.number()?;
                        self.push(token, line);
                    } else {
                        self.bump();
                        self.push(Token::Dot, line);
                    }
                }
                '$' => {
                    self.bump();
                    let name = self.ident();
                    let fields = if self.rest().starts_with('.') && self.starts_ident_at(1) {
                        self.field_chain()?
                    } else {
                        Vec::new()
                    };
                    self.push(Token::Var(name, fields), line);
                }
                c if c.is_ascii_digit() || c == '-' || c == '+' => {
                    let token = self.number()?;
                    self.push(token, line);
                }
                c if is_ident_start(c) => {
                    let word = self.ident();
                    let token = match word.as_str() {
                        "true" => Token::Bool(true),
                        "false" => Token::Bool(false),
                        "nil" => Token::Nil,
                        _ => Token::Ident(word),
                    };
                    self.push(token, line);
                }
                other => return Err(syntax(line, format!("unexpected character {:?} in action", other))),
            }
        }
    }

    fn lex_comment(&mut self, open_line: usize) -> Result<()> {
        let Some(end) = self.rest().find("*/") else {
            return Err(syntax(open_line, "unclosed comment"));
        };
        let target = self.pos + end + 2;
        while self.pos < target {
            self.bump();
        }
        let had_space = self.skip_space();
        if self.rest().starts_with(CLOSE) {
            self.pos += CLOSE.len();
        } else if had_space && self.rest().starts_with("-}}") {
            self.pos += 3;
            self.trim_next_text = true;
        } else {
            return Err(syntax(open_line, "comment ends before closing delimiter"));
        }
        Ok(())
    }

    fn skip_space(&mut self) -> bool {
        let mut skipped = false;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            // Leave the space in front of a trim marker for the caller to see.
            if self.rest()[c.len_utf8()..].starts_with("-}}") {
                self.bump();
                return true;
            }
            self.bump();
            skipped = true;
        }
        skipped
    }

    fn starts_ident_at(&self, offset: usize) -> bool {
        self.rest()[offset..].starts_with(is_ident_start)
    }

    fn ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn field_chain(&mut self) -> Result<Vec<String>> {
        let mut chain = Vec::new();
        while self.rest().starts_with('.') && self.starts_ident_at(1) {
            self.pos += 1;
            chain.push(self.ident());
        }
        Ok(chain)
    }

    fn number(&mut self) -> Result<Token> {
        let line = self.line;
        let rest = self.rest();
        let len = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let literal = &rest[..len];
        self.pos += len;

        let cleaned = literal.replace('_', "");
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(d) => (true, d.to_string()),
            None => (false, cleaned.trim_start_matches('+').to_string()),
        };
        let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
            .iter()
            .find(|(prefix, _)| digits.starts_with(prefix));
        let int = match radix {
            Some((prefix, radix)) => i64::from_str_radix(&digits[prefix.len()..], *radix).ok(),
            None => digits.parse::<i64>().ok(),
        };
        if let Some(i) = int {
            return Ok(Token::Int(if negative { -i } else { i }));
        }
        match cleaned.parse::<f64>() {
            Ok(f) if radix.is_none() => Ok(Token::Float(f)),
            _ => Err(syntax(line, format!("bad number syntax: {:?}", literal))),
        }
    }

    fn quoted_string(&mut self) -> Result<String> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(syntax(line, "unterminated quoted string")),
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.escape(line, '"')?),
                Some(c) => out.push(c),
            }
        }
    }

    fn char_constant(&mut self) -> Result<char> {
        let line = self.line;
        self.bump();
        let c = match self.bump() {
            Some('\\') => self.escape(line, '\'')?,
            Some(c) if c != '\'' && c != '\n' => c,
            _ => return Err(syntax(line, "malformed character constant")),
        };
        if self.bump() != Some('\'') {
            return Err(syntax(line, "malformed character constant"));
        }
        Ok(c)
    }

    fn escape(&mut self, line: usize, quote: char) -> Result<char> {
        let c = self.bump().ok_or_else(|| syntax(line, "unterminated escape"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '\\' => '\\',
            '0' => '\0',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'x' | 'u' | 'U' => {
                let width = match c {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let rest = self.rest();
                let digits = rest.get(..width).ok_or_else(|| syntax(line, "short escape"))?;
                let code = u32::from_str_radix(digits, 16)
                    .map_err(|_| syntax(line, format!("invalid escape \\{}{}", c, digits)))?;
                self.pos += width;
                char::from_u32(code).ok_or_else(|| syntax(line, "escape is not a valid character"))?
            }
            c if c == quote => c,
            other => return Err(syntax(line, format!("unknown escape sequence \\{}", other))),
        })
    }

    fn raw_string(&mut self) -> Result<String> {
        let line = self.line;
        self.bump();
        let Some(end) = self.rest().find('`') else {
            return Err(syntax(line, "unterminated raw quoted string"));
        };
        let body = self.rest()[..end].to_string();
        for _ in body.chars() {
            self.bump();
        }
        self.bump();
        Ok(body)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}
