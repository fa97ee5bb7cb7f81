//! Structure-preserving redaction of rendered output.
//!
//! Three strategies, tried in order:
//!
//! 1. text starting with `{` that parses as JSON: every scalar leaf is
//!    replaced, keys and nesting are kept, output is pretty-printed with
//!    sorted keys;
//! 2. text where most lines look like `key: value`: line-wise YAML masking
//!    that keeps indentation, keys, list markers and comments;
//! 3. anything else: `key: value` / `key=value` pairs and long quoted
//!    strings are masked in place.
//!
//! Every strategy is idempotent: masking masked output changes nothing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Replacement for every masked value.
pub const MASK: &str = "<MASKED>";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| unreachable!())
}

static YAML_KEY: Lazy<Regex> =
    Lazy::new(|| compile(r"^\s*(?:-\s+)?[A-Za-z_][A-Za-z0-9_.-]*\s*:(?:\s|$)"));

static YAML_KEY_LINE: Lazy<Regex> =
    Lazy::new(|| compile(r"^(\s*(?:-\s+)?)([A-Za-z_][A-Za-z0-9_.-]*)\s*:(?:\s+(.*))?$"));

static YAML_LIST_ITEM: Lazy<Regex> = Lazy::new(|| compile(r"^(\s*)-(?:\s+(.*))?$"));

static BLOCK_SCALAR: Lazy<Regex> = Lazy::new(|| compile(r"^[|>][-+0-9]*\s*(?:#.*)?$"));

static GENERIC_PAIR: Lazy<Regex> = Lazy::new(|| {
    compile(r#"(?P<key>[\w.-]+)(?P<sep>[ \t]*[:=][ \t]*)(?P<value>"[^"\n]*"|'[^'\n]*'|[^\s]+)"#)
});

static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| compile(r#""[^"\n]{8,}""#));

static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| compile(r"'[^'\n]{8,}'"));

/// Mask `rendered`, choosing the strategy from its shape.
pub fn mask(rendered: &str) -> String {
    if rendered.trim_start().starts_with('{') {
        if let Some(masked) = mask_json(rendered) {
            return masked;
        }
        tracing::debug!("output starts with '{{' but is not JSON, using generic masking");
    }
    if is_yaml_like(rendered) {
        return mask_yaml(rendered);
    }
    mask_generic(rendered)
}

/// Mask a JSON document; `None` if it does not parse.
pub fn mask_json(rendered: &str) -> Option<String> {
    let value: Value = serde_json::from_str(rendered).ok()?;
    serde_json::to_string_pretty(&mask_value(value)).ok()
}

fn mask_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, mask_value(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(mask_value).collect()),
        _ => Value::String(MASK.to_string()),
    }
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Whether strictly more than half of the content lines are `key:` lines.
pub fn is_yaml_like(text: &str) -> bool {
    let (content, keyed) = text
        .lines()
        .filter(|line| is_content(line))
        .fold((0usize, 0usize), |(content, keyed), line| {
            (content + 1, keyed + usize::from(YAML_KEY.is_match(line)))
        });
    content > 0 && keyed * 2 > content
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Line-wise YAML masking.
pub fn mask_yaml(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    // Indentation of the key that opened a block scalar being skipped.
    let mut block_owner: Option<usize> = None;

    for line in text.split('\n') {
        if let Some(owner) = block_owner {
            if line.trim().is_empty() || indent_width(line) > owner {
                continue;
            }
            block_owner = None;
        }

        if !is_content(line) || matches!(line.trim(), "---" | "...") {
            out.push(line.to_string());
            continue;
        }

        if let Some(caps) = YAML_KEY_LINE.captures(line) {
            let value = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
            if value.is_empty() {
                out.push(line.to_string());
                continue;
            }
            if BLOCK_SCALAR.is_match(value) {
                block_owner = Some(indent_width(line));
            }
            out.push(format!("{}{}: {}", &caps[1], &caps[2], MASK));
            continue;
        }

        if let Some(caps) = YAML_LIST_ITEM.captures(line) {
            let item = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            if item.is_empty() {
                out.push(line.to_string());
                continue;
            }
            if BLOCK_SCALAR.is_match(item) {
                block_owner = Some(indent_width(line));
            }
            out.push(format!("{}- {}", &caps[1], MASK));
            continue;
        }

        out.push(format!("{}{}", &line[..indent_width(line)], MASK));
    }
    out.join("\n")
}

fn requote(original: &str) -> String {
    match original.chars().next() {
        Some(q @ ('"' | '\'')) if original.len() >= 2 && original.ends_with(q) => {
            format!("{}{}{}", q, MASK, q)
        }
        _ => MASK.to_string(),
    }
}

/// Pattern-based masking for free-form text.
pub fn mask_generic(text: &str) -> String {
    let pairs = GENERIC_PAIR.replace_all(text, |caps: &Captures| {
        format!("{}{}{}", &caps["key"], &caps["sep"], requote(&caps["value"]))
    });
    let doubled = DOUBLE_QUOTED.replace_all(&pairs, format!("\"{}\"", MASK).as_str());
    SINGLE_QUOTED
        .replace_all(&doubled, format!("'{}'", MASK).as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn key_paths(value: &Value, prefix: &str, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let path = format!("{}/{}", prefix, k);
                    out.push(path.clone());
                    key_paths(v, &path, out);
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    key_paths(v, &format!("{}[{}]", prefix, i), out);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_json_structure_kept() {
        let input = r#"{"password":"s3cr3t","nested":{"x":"y"},"n":[1,true,null,{"k":2.5}]}"#;
        let masked = mask(input);
        let parsed: Value = serde_json::from_str(&masked).unwrap();
        assert_eq!(
            parsed,
            json!({
                "n": [MASK, MASK, MASK, {"k": MASK}],
                "nested": {"x": MASK},
                "password": MASK
            })
        );
        assert!(masked.contains("\n  \"n\": ["));
        assert!(!masked.contains("s3cr3t"));
    }

    #[test]
    fn test_invalid_json_falls_back_to_generic() {
        let masked = mask("{ password=hunter2 broken");
        assert_eq!(masked, "{ password=<MASKED> broken");
    }

    #[test]
    fn test_yaml_detection_needs_majority() {
        assert!(is_yaml_like("a: 1\nb: 2\nfree text"));
        assert!(!is_yaml_like("a: 1\nfree\ntext"));
        assert!(!is_yaml_like("# only a comment\n\n"));
        assert!(!is_yaml_like("url=postgres://u:p@h"));
    }

    #[test]
    fn test_yaml_masking() {
        let input = "\
# database
db:
  user: admin
  password: \"s3cr3t\"
  hosts:
    - one.example.com
    - name: two
  cert: |
    -----BEGIN CERTIFICATE-----
    MIIB
    -----END CERTIFICATE-----
  port: 5432 # default
stray value
";
        let expected = "\
# database
db:
  user: <MASKED>
  password: <MASKED>
  hosts:
    - <MASKED>
    - name: <MASKED>
  cert: <MASKED>
  port: <MASKED>
<MASKED>
";
        assert_eq!(mask(input), expected);
        assert_eq!(mask(expected), expected);
    }

    #[test]
    fn test_generic_masking() {
        let input = "export TOKEN=abc123\nurl: https://x\nnote \"a long quoted secret\" and 'short'\npw = \"two words\"";
        let masked = mask_generic(input);
        assert_eq!(
            masked,
            "export TOKEN=<MASKED>\nurl: <MASKED>\nnote \"<MASKED>\" and 'short'\npw = \"<MASKED>\""
        );
        assert_eq!(mask_generic(&masked), masked);
    }

    #[test]
    fn test_generic_keeps_separator_style() {
        assert_eq!(mask_generic("a:1 b = 2"), "a:<MASKED> b = <MASKED>");
    }

    proptest! {
        #[test]
        fn test_json_masking_keeps_keys_and_is_idempotent(
            entries in proptest::collection::btree_map(
                "[a-z]{1,6}",
                prop_oneof![
                    any::<i64>().prop_map(Value::from),
                    "[ -~]{0,12}".prop_map(Value::from),
                    proptest::collection::btree_map("[a-z]{1,4}", "[a-z0-9]{0,6}", 0..4)
                        .prop_map(|m| json!(m)),
                ],
                1..6,
            )
        ) {
            let input = serde_json::to_string(&json!(entries)).unwrap();
            let once = mask(&input);
            let original: Value = serde_json::from_str(&input).unwrap();
            let masked: Value = serde_json::from_str(&once).unwrap();

            let (mut before, mut after) = (Vec::new(), Vec::new());
            key_paths(&original, "", &mut before);
            key_paths(&masked, "", &mut after);
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
            prop_assert_eq!(mask(&once), once);
        }

        #[test]
        fn test_yaml_masking_is_idempotent(
            lines in proptest::collection::vec(("[a-z_][a-z0-9_]{0,8}", "[A-Za-z0-9]{1,12}"), 1..8)
        ) {
            let input: String = lines
                .iter()
                .map(|(k, v)| format!("{}: {}\n", k, v))
                .collect();
            let once = mask(&input);
            for (key, _) in &lines {
                let expected = format!("{}: {}", key, MASK);
                prop_assert!(once.contains(&expected));
            }
            prop_assert_eq!(mask(&once), once);
        }
    }
}
