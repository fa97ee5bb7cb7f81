//! # Santa Template
//!
//! A restricted dialect of Go's `text/template` for rendering generated
//! secrets into configuration files.
//!
//! The dialect supports field chains, variables, pipelines, `if`/`with`/
//! `range` with `else` chains and `break`/`continue`, and a fixed function
//! library (see [`functions`]). It differs from the full language in a few
//! deliberate ways:
//!
//! - a security guard rejects root-context dumps (`{{.}}`, `{{range .}}`,
//!   `{{with .}}`) and the `call`, `js` and `urlquery` functions before the
//!   source is even tokenized, and the parsed tree is checked again for the
//!   root passed as an argument, piped, parenthesised or bound to a variable;
//! - `range` over an integer, `indent` and `printf` widths are bounded;
//! - missing map keys are execution errors, never empty output;
//! - unknown functions and undefined variables fail at parse time;
//! - `define`, `template` and `block` are not available.
//!
//! ## Example
//!
//! ```
//! use santa_template::Engine;
//! use santa_types::RenderContext;
//! use std::collections::HashMap;
//!
//! let mut context = RenderContext::new();
//! context.insert(
//!     "DB".to_string(),
//!     HashMap::from([("password".to_string(), "hunter2".to_string())]),
//! );
//!
//! let out = Engine::new()
//!     .render("password={{ .DB.password | quote }}", &context)
//!     .unwrap();
//! assert_eq!(out, "password=\"hunter2\"");
//!
//! assert!(Engine::new().validate("{{ . }}").is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod exec;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod security;
pub mod value;

use santa_core::config::DEFAULT_MAX_TEMPLATE_SIZE;
use santa_types::{RenderContext, Result, SantaError};

pub use parser::Node;
pub use value::Value;

/// Template front end: size limit, security guard, parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    max_size: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_TEMPLATE_SIZE,
        }
    }
}

impl Engine {
    /// Engine with the default size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest accepted template, in bytes.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Largest accepted template, in bytes.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Check a template without rendering it.
    pub fn validate(&self, src: &str) -> Result<()> {
        self.parse(src).map(|_| ())
    }

    /// Run the size check and the security guard, then parse.
    pub fn parse(&self, src: &str) -> Result<Template> {
        if src.trim().is_empty() {
            return Err(SantaError::TemplateSyntax("template cannot be empty".to_string()));
        }
        if src.len() > self.max_size {
            return Err(SantaError::TemplateSyntax(format!(
                "template is {} bytes, larger than the {} byte limit",
                src.len(),
                self.max_size
            )));
        }
        security::check(src)?;

        let tokens = lexer::tokenize(src)?;
        let token_count = tokens.len();
        let nodes = parser::parse(tokens)?;
        security::check_tree(&nodes)?;
        tracing::trace!(tokens = token_count, nodes = nodes.len(), "parsed template");
        Ok(Template { nodes })
    }

    /// Parse `src` and render it against `context`.
    pub fn render(&self, src: &str, context: &RenderContext) -> Result<String> {
        self.parse(src)?.render(context)
    }
}

/// A parsed, validated template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Top-level syntax tree.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against generator outputs.
    pub fn render(&self, context: &RenderContext) -> Result<String> {
        self.render_value(&Value::from(context))
    }

    /// Render against an arbitrary value.
    pub fn render_value(&self, data: &Value) -> Result<String> {
        exec::execute(&self.nodes, data)
    }
}

/// Render with a default [`Engine`].
pub fn render(src: &str, context: &RenderContext) -> Result<String> {
    Engine::default().render(src, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use santa_types::SecurityViolation;
    use std::collections::HashMap;

    fn context() -> RenderContext {
        let mut ctx = RenderContext::new();
        ctx.insert(
            "DB".to_string(),
            HashMap::from([
                ("password".to_string(), "s3cr3t-pass".to_string()),
                ("user".to_string(), "admin".to_string()),
            ]),
        );
        ctx.insert(
            "Key".to_string(),
            HashMap::from([("key_hex".to_string(), "00ff".to_string())]),
        );
        ctx
    }

    #[test]
    fn test_render_with_functions() {
        let out = render(
            "user={{ .DB.user }}\npass={{ .DB.password | compact | upper }}\nkey={{ .Key.key_hex | len }}",
            &context(),
        )
        .unwrap();
        assert_eq!(out, "user=admin\npass=S3CR3TPASS\nkey=4");
    }

    #[test]
    fn test_empty_and_oversized() {
        let err = Engine::new().validate("  \n").unwrap_err();
        assert_eq!(err.to_string(), "template syntax error: template cannot be empty");

        let err = Engine::new().with_max_size(8).validate("{{ .DB.user }}").unwrap_err();
        assert!(matches!(err, SantaError::TemplateSyntax(ref m) if m.contains("8 byte limit")));
    }

    #[test]
    fn test_security_runs_before_parsing() {
        // Not even lexable, but the guard fires first.
        let err = Engine::new().validate("{{ . }}{{ \"unterminated }}").unwrap_err();
        assert!(matches!(
            err,
            SantaError::TemplateSecurity(SecurityViolation::RootContextAccess)
        ));
        assert_eq!(
            err.to_string(),
            "template validation failed: direct root context access is not allowed"
        );
    }

    #[test]
    fn test_root_rejected_after_parsing() {
        for src in [
            "{{ toJson . }}",
            "{{ . | toJson }}",
            "{{ printf \"%v\" . }}",
            "{{ $x := . }}{{ $x }}",
            "{{ (.) }}",
        ] {
            let err = Engine::new().validate(src).unwrap_err();
            assert!(
                matches!(err, SantaError::TemplateSecurity(SecurityViolation::RootContextAccess)),
                "{}: {}",
                src,
                err
            );
        }
        assert_eq!(
            render("{{ with .DB }}{{ .user }}{{ end }}", &context()).unwrap(),
            "admin"
        );
    }

    #[test]
    fn test_runaway_output_is_refused() {
        let err = render("{{ indent 9223372036854775807 \"x\" }}", &context()).unwrap_err();
        assert!(matches!(err, SantaError::TemplateExecution(ref m) if m.contains("indent width")), "{}", err);
        let err = render("{{ printf \"%9999999999999s\" \"x\" }}", &context()).unwrap_err();
        assert!(matches!(err, SantaError::TemplateExecution(ref m) if m.contains("format width")), "{}", err);
        let err = render("{{ range 1000000000 }}{{ end }}", &context()).unwrap_err();
        assert!(matches!(err, SantaError::TemplateExecution(_)), "{}", err);
    }

    #[test]
    fn test_strict_missing_key() {
        let err = render("{{ .DB.passwd }}", &context()).unwrap_err();
        assert!(matches!(err, SantaError::TemplateExecution(ref m) if m.contains("passwd")));
        let err = render("{{ .Nope.x }}", &context()).unwrap_err();
        assert!(matches!(err, SantaError::TemplateExecution(_)));
    }

    #[test]
    fn test_parse_once_render_many() {
        let template = Engine::new().parse("{{ .DB.user }}").unwrap();
        assert_eq!(template.nodes().len(), 1);
        let first = template.render(&context()).unwrap();
        let second = template.render(&context()).unwrap();
        assert_eq!(first, second);
    }
}
