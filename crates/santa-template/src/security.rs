//! Guards against templates that dump or escape the context.
//!
//! [`check`] runs on the raw source, before lexing, so the obvious forms
//! never reach the parser. Patterns are checked in a fixed order and the
//! first hit is reported. [`check_tree`] then walks the parsed template and
//! catches the root reached through arguments, pipes, parentheses or
//! variable bindings.

use once_cell::sync::Lazy;
use regex::Regex;
use santa_types::SecurityViolation;

use crate::parser::{Node, Operand, Pipeline};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| unreachable!())
}

static STRUCTURAL: Lazy<[(Regex, SecurityViolation); 3]> = Lazy::new(|| {
    [
        (
            compile(r"\{\{-?\s*[.$]\s*-?\}\}"),
            SecurityViolation::RootContextAccess,
        ),
        (
            compile(r"\{\{-?\s*range\s+(?:\$\w+\s*(?:,\s*\$\w+\s*)?:=\s*)?[.$]\s*-?\}\}"),
            SecurityViolation::RangeOverRoot,
        ),
        (
            compile(r"\{\{-?\s*(?:else\s+)?with\s+(?:\$\w+\s*:=\s*)?[.$]\s*-?\}\}"),
            SecurityViolation::WithRoot,
        ),
    ]
});

static ACTION: Lazy<Regex> = Lazy::new(|| compile(r"(?s)\{\{.*?\}\}"));

// A bare word, not a `.field` or `$variable` that happens to share the name.
static FORBIDDEN_WORDS: Lazy<[(Regex, SecurityViolation); 3]> = Lazy::new(|| {
    [
        (compile(r"(?:^|[^\w.$])call\b"), SecurityViolation::CallFunction),
        (compile(r"(?:^|[^\w.$])js\b"), SecurityViolation::JsFunction),
        (compile(r"(?:^|[^\w.$])urlquery\b"), SecurityViolation::UrlQueryFunction),
    ]
});

/// Check `src` against every blocked construct.
pub fn check(src: &str) -> Result<(), SecurityViolation> {
    for (pattern, violation) in STRUCTURAL.iter() {
        if pattern.is_match(src) {
            return Err(*violation);
        }
    }

    let actions: Vec<&str> = ACTION
        .find_iter(src)
        .map(|m| {
            let inner = m.as_str();
            &inner[2..inner.len() - 2]
        })
        .collect();
    for (pattern, violation) in FORBIDDEN_WORDS.iter() {
        if actions.iter().any(|action| pattern.is_match(action)) {
            return Err(*violation);
        }
    }
    Ok(())
}

/// Reject every place where the whole context is used as a value.
///
/// `.` is the root outside `range` and `with` bodies, `$` is the root
/// everywhere. Either is fine when followed by a field chain.
pub fn check_tree(nodes: &[Node]) -> Result<(), SecurityViolation> {
    walk(nodes, true)
}

fn walk(nodes: &[Node], dot_is_root: bool) -> Result<(), SecurityViolation> {
    for node in nodes {
        match node {
            Node::Text(_) | Node::Break | Node::Continue => {}
            Node::Action(pipe) => pipeline(pipe, dot_is_root)?,
            Node::If(cond) => {
                for (pipe, body) in &cond.branches {
                    pipeline(pipe, dot_is_root)?;
                    walk(body, dot_is_root)?;
                }
                walk(&cond.else_body, dot_is_root)?;
            }
            Node::With(cond) => {
                for (pipe, body) in &cond.branches {
                    if is_root(pipe, dot_is_root) {
                        return Err(SecurityViolation::WithRoot);
                    }
                    pipeline(pipe, dot_is_root)?;
                    walk(body, false)?;
                }
                walk(&cond.else_body, dot_is_root)?;
            }
            Node::Range(range) => {
                if is_root(&range.pipe, dot_is_root) {
                    return Err(SecurityViolation::RangeOverRoot);
                }
                pipeline(&range.pipe, dot_is_root)?;
                walk(&range.body, false)?;
                walk(&range.else_body, dot_is_root)?;
            }
        }
    }
    Ok(())
}

/// The pipeline is nothing but the root: `.`, `$`, `(.)`, `((($)))`.
fn is_root(pipe: &Pipeline, dot_is_root: bool) -> bool {
    match pipe.commands.as_slice() {
        [command] => match command.args.as_slice() {
            [operand] => operand_is_root(operand, dot_is_root),
            _ => false,
        },
        _ => false,
    }
}

fn operand_is_root(operand: &Operand, dot_is_root: bool) -> bool {
    match operand {
        Operand::Dot => dot_is_root,
        Operand::Var(name, chain) => name.is_empty() && chain.is_empty(),
        Operand::Sub(inner, chain) => chain.is_empty() && is_root(inner, dot_is_root),
        _ => false,
    }
}

fn pipeline(pipe: &Pipeline, dot_is_root: bool) -> Result<(), SecurityViolation> {
    for operand in pipe.commands.iter().flat_map(|command| &command.args) {
        if operand_is_root(operand, dot_is_root) {
            return Err(SecurityViolation::RootContextAccess);
        }
        // `(.).A` is a field access like `.A`.
        if let Operand::Sub(inner, chain) = operand {
            if chain.is_empty() || !is_root(inner, dot_is_root) {
                pipeline(inner, dot_is_root)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use proptest::prelude::*;

    fn check_parsed(src: &str) -> Result<(), SecurityViolation> {
        let nodes = parse(tokenize(src).unwrap()).unwrap();
        check_tree(&nodes)
    }

    #[test]
    fn test_blocked_constructs() {
        let cases = [
            ("{{.}}", SecurityViolation::RootContextAccess),
            ("{{- $ -}}", SecurityViolation::RootContextAccess),
            ("{{range .}}{{end}}", SecurityViolation::RangeOverRoot),
            ("{{ range $k, $v := . }}{{ end }}", SecurityViolation::RangeOverRoot),
            ("{{ range $ }}{{ end }}", SecurityViolation::RangeOverRoot),
            ("{{with .}}{{end}}", SecurityViolation::WithRoot),
            ("{{ with .A }}{{ else with $ }}{{ end }}", SecurityViolation::WithRoot),
            ("{{ call .Fn }}", SecurityViolation::CallFunction),
            ("{{ .A | js }}", SecurityViolation::JsFunction),
            ("{{ urlquery .value }}", SecurityViolation::UrlQueryFunction),
        ];
        for (src, expected) in cases {
            assert_eq!(check(src), Err(expected), "{}", src);
        }
    }

    #[test]
    fn test_first_pattern_wins() {
        assert_eq!(
            check("{{ call .F }}{{ . }}"),
            Err(SecurityViolation::RootContextAccess)
        );
        assert_eq!(
            check("{{ urlquery .A }}{{ js .B }}"),
            Err(SecurityViolation::JsFunction)
        );
    }

    #[test]
    fn test_nested_access_allowed() {
        for src in [
            "{{.User.Name}}",
            "{{range .Items}}{{.name}}{{end}}",
            "{{ with .DB }}{{ .password }}{{ end }}",
            "{{ $.DB.password }}",
            "{{ .Svc.call }} {{ $js := 1 }}{{ $js }}",
            "plain text mentioning call and js",
            "{{ recall .A }}",
        ] {
            assert_eq!(check(src), Ok(()), "{}", src);
        }
    }

    proptest! {
        #[test]
        fn test_field_chains_pass(chain in proptest::collection::vec("[A-Z][a-zA-Z0-9_]{0,8}", 1..4)) {
            let src = format!("{{{{ .{} }}}}", chain.join("."));
            prop_assert_eq!(check(&src), Ok(()));
        }

        #[test]
        fn test_call_always_rejected(prefix in "[a-z ]{0,10}", field in "[A-Z][a-z]{0,6}") {
            let src = format!("{}{{{{ call .{} }}}}", prefix, field);
            prop_assert_eq!(check(&src), Err(SecurityViolation::CallFunction));
        }
    }

    #[test]
    fn test_root_reached_indirectly() {
        let cases = [
            ("{{ toJson . }}", SecurityViolation::RootContextAccess),
            ("{{ . | toJson }}", SecurityViolation::RootContextAccess),
            ("{{ printf \"%v\" . }}", SecurityViolation::RootContextAccess),
            ("{{ $x := . }}{{ $x }}", SecurityViolation::RootContextAccess),
            ("{{ (.) }}", SecurityViolation::RootContextAccess),
            ("{{ $ | toJson }}", SecurityViolation::RootContextAccess),
            ("{{ if . }}x{{ end }}", SecurityViolation::RootContextAccess),
            ("{{ range .L }}{{ toJson $ }}{{ end }}", SecurityViolation::RootContextAccess),
            ("{{ with .A }}{{ else }}{{ toJson . }}{{ end }}", SecurityViolation::RootContextAccess),
            ("{{ range .L }}{{ else }}{{ len . }}{{ end }}", SecurityViolation::RootContextAccess),
            ("{{ range (.) }}{{ end }}", SecurityViolation::RangeOverRoot),
            ("{{ range $i, $v := (($)) }}{{ end }}", SecurityViolation::RangeOverRoot),
            ("{{ with (.) }}{{ end }}", SecurityViolation::WithRoot),
            ("{{ range keys . }}{{ end }}", SecurityViolation::RootContextAccess),
        ];
        for (src, expected) in cases {
            assert_eq!(check(src), Ok(()), "pre-parse pass should not see {}", src);
            assert_eq!(check_parsed(src), Err(expected), "{}", src);
        }
    }

    #[test]
    fn test_rebound_dot_allowed() {
        for src in [
            "{{ range .L }}{{ toJson . }}{{ end }}",
            "{{ with .DB }}{{ . | toJson }}{{ $x := . }}{{ $x.user }}{{ end }}",
            "{{ range $k, $v := .M }}{{ printf \"%v\" . }}{{ end }}",
            "{{ if .A }}{{ with .A }}{{ (.) }}{{ end }}{{ end }}",
            "{{ (.).DB.user }} {{ $.DB.user }} {{ toJson .DB }}",
            "{{ $x := .DB }}{{ toJson $x }}",
        ] {
            assert_eq!(check_parsed(src), Ok(()), "{}", src);
        }
    }
}
