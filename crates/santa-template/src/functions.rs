//! Template function library.
//!
//! A fixed table: the text/template builtins that are safe for secret
//! rendering, a subset of the usual sprig helpers, and a handful of
//! secret-specific helpers (`sha256`, `bcrypt`, `entropy`, `crc32`,
//! `urlSafeB64`, `compact`, `toBinary`, `toHex`). `call`, `js` and
//! `urlquery` are deliberately absent.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use once_cell::sync::Lazy;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

use crate::value::{format_float, Value};

/// Result of a template function; errors are bare messages.
pub type FuncResult = std::result::Result<Value, String>;

/// Signature shared by every template function.
pub type Func = fn(&[Value]) -> FuncResult;

/// Cost used by the `bcrypt` helper.
pub const BCRYPT_COST: u32 = 10;

/// bcrypt only looks at the first 72 bytes of its input.
const BCRYPT_MAX_INPUT: usize = 72;

/// Largest string `repeat` or `indent` may build.
const MAX_REPEAT_OUTPUT: usize = 1024 * 1024;

/// Largest `indent` width and `printf` width or precision.
pub const MAX_FORMAT_WIDTH: usize = 10_000;

static FUNCTIONS: Lazy<HashMap<&'static str, Func>> = Lazy::new(|| {
    let table: [(&'static str, Func); 69] = [
        // secret helpers
        ("sha256", sha256),
        ("bcrypt", bcrypt_hash),
        ("entropy", entropy),
        ("crc32", crc32),
        ("urlSafeB64", url_safe_b64),
        ("compact", compact),
        ("toBinary", to_binary),
        ("toHex", to_hex),
        // strings
        ("upper", upper),
        ("lower", lower),
        ("title", title),
        ("trim", trim),
        ("trimAll", trim_all),
        ("trimPrefix", trim_prefix),
        ("trimSuffix", trim_suffix),
        ("replace", replace),
        ("contains", contains),
        ("hasPrefix", has_prefix),
        ("hasSuffix", has_suffix),
        ("repeat", repeat),
        ("quote", quote),
        ("squote", squote),
        ("indent", indent),
        ("nindent", nindent),
        ("substr", substr),
        ("trunc", trunc),
        ("splitList", split_list),
        ("join", join),
        // encoding
        ("b64enc", b64enc),
        ("b64dec", b64dec),
        ("sha1sum", sha1sum),
        ("sha256sum", sha256),
        ("uuidv4", uuidv4),
        ("toString", to_string),
        ("toJson", to_json),
        // formatting
        ("printf", printf),
        ("print", print),
        ("println", println),
        ("html", html),
        // collections
        ("list", list),
        ("dict", dict),
        ("get", get),
        ("hasKey", has_key),
        ("keys", keys),
        ("first", first),
        ("last", last),
        ("index", index),
        ("len", len),
        ("default", default),
        ("empty", empty),
        ("coalesce", coalesce),
        // logic
        ("eq", eq),
        ("ne", ne),
        ("lt", lt),
        ("le", le),
        ("gt", gt),
        ("ge", ge),
        ("and", and),
        ("or", or),
        ("not", not),
        // arithmetic
        ("atoi", atoi),
        ("int", int),
        ("add", add),
        ("sub", sub),
        ("mul", mul),
        ("div", div),
        ("mod", modulo),
        ("max", max),
        ("min", min),
    ];
    table.into_iter().collect()
});

/// Whether `name` is a template function.
pub fn exists(name: &str) -> bool {
    FUNCTIONS.contains_key(name)
}

/// Look up a template function.
pub fn lookup(name: &str) -> Option<Func> {
    FUNCTIONS.get(name).copied()
}

/// Sorted names of every template function.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = FUNCTIONS.keys().copied().collect();
    names.sort_unstable();
    names
}

fn want(args: &[Value], n: usize) -> std::result::Result<(), String> {
    if args.len() != n {
        return Err(format!("wrong number of args: want {} got {}", n, args.len()));
    }
    Ok(())
}

fn want_at_least(args: &[Value], n: usize) -> std::result::Result<(), String> {
    if args.len() < n {
        return Err(format!("wrong number of args: want at least {} got {}", n, args.len()));
    }
    Ok(())
}

/// String view used by string functions; nil is empty.
fn text(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lenient integer conversion: anything unparseable is zero.
fn int_of(value: &Value) -> i64 {
    match value {
        Value::Float(f) if f.is_finite() => *f as i64,
        Value::Str(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        other => other.as_int().unwrap_or(0),
    }
}

fn strict_int(value: &Value, what: &str) -> std::result::Result<i64, String> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| format!("{} must be an integer, got \"{}\"", what, s)),
        other => Err(format!("{} must be an integer, got {}", what, other.kind())),
    }
}

fn overflow() -> String {
    "integer overflow".to_string()
}

fn sha256(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(hex::encode(Sha256::digest(text(&args[0]).as_bytes()))))
}

fn sha1sum(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(hex::encode(Sha1::digest(text(&args[0]).as_bytes()))))
}

fn bcrypt_hash(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    let input = text(&args[0]);
    let bytes = input.as_bytes();
    let bytes = &bytes[..bytes.len().min(BCRYPT_MAX_INPUT)];
    bcrypt::hash(bytes, BCRYPT_COST)
        .map(Value::Str)
        .map_err(|e| format!("bcrypt failed: {}", e))
}

fn entropy(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let secret = text(&args[0]);
    let charset = text(&args[1]);
    Ok(Value::Float(secret.len() as f64 * (charset.len() as f64).log2()))
}

fn crc32(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(format!("{:08x}", crc32fast::hash(text(&args[0]).as_bytes()))))
}

fn url_safe_b64(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(URL_SAFE.encode(text(&args[0]))))
}

fn compact(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(text(&args[0]).replace('-', "")))
}

fn radix_digits(args: &[Value], radix: u32) -> FuncResult {
    want(args, 1)?;
    let number = match &args[0] {
        Value::Int(i) => Some(*i),
        Value::Str(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        return Ok(Value::Str(String::new()));
    };
    let magnitude = (number as i128).unsigned_abs();
    let digits = match radix {
        2 => format!("{:b}", magnitude),
        _ => format!("{:x}", magnitude),
    };
    Ok(Value::Str(if number < 0 { format!("-{}", digits) } else { digits }))
}

fn to_binary(args: &[Value]) -> FuncResult {
    radix_digits(args, 2)
}

fn to_hex(args: &[Value]) -> FuncResult {
    radix_digits(args, 16)
}

fn upper(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(text(&args[0]).to_uppercase()))
}

fn lower(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(text(&args[0]).to_lowercase()))
}

fn title(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    let mut out = String::new();
    let mut at_word_start = true;
    for c in text(&args[0]).chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    Ok(Value::Str(out))
}

fn trim(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(text(&args[0]).trim().to_string()))
}

fn trim_all(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let cutset = text(&args[0]);
    Ok(Value::Str(
        text(&args[1]).trim_matches(|c: char| cutset.contains(c)).to_string(),
    ))
}

fn trim_prefix(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let prefix = text(&args[0]);
    let s = text(&args[1]);
    Ok(Value::Str(s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string()))
}

fn trim_suffix(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let suffix = text(&args[0]);
    let s = text(&args[1]);
    Ok(Value::Str(s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string()))
}

fn replace(args: &[Value]) -> FuncResult {
    want(args, 3)?;
    Ok(Value::Str(text(&args[2]).replace(&text(&args[0]), &text(&args[1]))))
}

fn contains(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(text(&args[1]).contains(&text(&args[0]))))
}

fn has_prefix(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(text(&args[1]).starts_with(&text(&args[0]))))
}

fn has_suffix(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(text(&args[1]).ends_with(&text(&args[0]))))
}

fn repeat(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let count = strict_int(&args[0], "count")?;
    let s = text(&args[1]);
    let count = usize::try_from(count).map_err(|_| "negative repeat count".to_string())?;
    if s.len().saturating_mul(count) > MAX_REPEAT_OUTPUT {
        return Err(format!("repeat output exceeds {} bytes", MAX_REPEAT_OUTPUT));
    }
    Ok(Value::Str(s.repeat(count)))
}

/// Double-quote `s` with Go-style escapes.
pub(crate) fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn quote(args: &[Value]) -> FuncResult {
    let quoted: Vec<String> = args
        .iter()
        .filter(|v| !matches!(v, Value::Nil))
        .map(|v| go_quote(&text(v)))
        .collect();
    Ok(Value::Str(quoted.join(" ")))
}

fn squote(args: &[Value]) -> FuncResult {
    let quoted: Vec<String> = args
        .iter()
        .filter(|v| !matches!(v, Value::Nil))
        .map(|v| format!("'{}'", text(v)))
        .collect();
    Ok(Value::Str(quoted.join(" ")))
}

fn indent_by(args: &[Value]) -> std::result::Result<String, String> {
    want(args, 2)?;
    let width = strict_int(&args[0], "indent width")?;
    let width = usize::try_from(width).unwrap_or(0);
    if width > MAX_FORMAT_WIDTH {
        return Err(format!("indent width {} exceeds {}", width, MAX_FORMAT_WIDTH));
    }
    let body = text(&args[1]);
    let lines = body.matches('\n').count() + 1;
    if width.saturating_mul(lines).saturating_add(body.len()) > MAX_REPEAT_OUTPUT {
        return Err(format!("indent output exceeds {} bytes", MAX_REPEAT_OUTPUT));
    }
    let pad = " ".repeat(width);
    Ok(format!("{}{}", pad, body.replace('\n', &format!("\n{}", pad))))
}

fn indent(args: &[Value]) -> FuncResult {
    indent_by(args).map(Value::Str)
}

fn nindent(args: &[Value]) -> FuncResult {
    indent_by(args).map(|s| Value::Str(format!("\n{}", s)))
}

fn substr(args: &[Value]) -> FuncResult {
    want(args, 3)?;
    let chars: Vec<char> = text(&args[2]).chars().collect();
    let len = chars.len() as i64;
    let start = int_of(&args[0]);
    let end = int_of(&args[1]);
    let (from, to) = if start < 0 {
        (0, end.clamp(0, len))
    } else if end < 0 || end > len {
        (start.min(len), len)
    } else {
        (start.min(end), end)
    };
    Ok(Value::Str(chars[from as usize..to as usize].iter().collect()))
}

fn trunc(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let count = int_of(&args[0]);
    let chars: Vec<char> = text(&args[1]).chars().collect();
    let len = chars.len() as i64;
    let kept: String = if count < 0 && len + count > 0 {
        chars[(len + count) as usize..].iter().collect()
    } else if count >= 0 && len > count {
        chars[..count as usize].iter().collect()
    } else {
        chars.iter().collect()
    };
    Ok(Value::Str(kept))
}

fn split_list(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let sep = text(&args[0]);
    let s = text(&args[1]);
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(Value::from).collect()
    };
    Ok(Value::List(parts))
}

fn join(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let sep = text(&args[0]);
    Ok(Value::Str(match &args[1] {
        Value::List(items) => items.iter().map(text).collect::<Vec<_>>().join(&sep),
        other => text(other),
    }))
}

fn b64enc(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(STANDARD.encode(text(&args[0]))))
}

fn b64dec(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    let bytes = STANDARD
        .decode(text(&args[0]).trim())
        .map_err(|e| format!("invalid base64: {}", e))?;
    String::from_utf8(bytes)
        .map(Value::Str)
        .map_err(|_| "decoded base64 is not valid UTF-8".to_string())
}

fn uuidv4(args: &[Value]) -> FuncResult {
    want(args, 0)?;
    Ok(Value::Str(uuid::Uuid::new_v4().to_string()))
}

fn to_string(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Str(text(&args[0])))
}

fn to_json(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    serde_json::to_string(&args[0].to_json())
        .map(Value::Str)
        .map_err(|e| e.to_string())
}

/// `fmt.Sprint` spacing: a space between operands when neither is a string.
fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !matches!(arg, Value::Str(_)) && !matches!(args[i - 1], Value::Str(_)) {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

fn print(args: &[Value]) -> FuncResult {
    Ok(Value::Str(sprint(args)))
}

fn println(args: &[Value]) -> FuncResult {
    let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    Ok(Value::Str(format!("{}\n", parts.join(" "))))
}

fn html(args: &[Value]) -> FuncResult {
    let raw = sprint(args);
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    Ok(Value::Str(out))
}

struct Spec {
    minus: bool,
    plus: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec {
    fn pad(&self, body: String, numeric: bool) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;
        if self.minus {
            format!("{}{}", body, " ".repeat(fill))
        } else if self.zero && numeric {
            let (sign, digits) = match body.strip_prefix('-') {
                Some(rest) => ("-", rest.to_string()),
                None => match body.strip_prefix('+') {
                    Some(rest) => ("+", rest.to_string()),
                    None => ("", body.clone()),
                },
            };
            format!("{}{}{}", sign, "0".repeat(fill), digits)
        } else {
            format!("{}{}", " ".repeat(fill), body)
        }
    }

    fn signed(&self, body: String, negative: bool) -> String {
        if self.plus && !negative {
            format!("+{}", body)
        } else {
            body
        }
    }
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{}({}={})", verb, arg.kind(), arg)
}

fn format_arg(verb: char, spec: &Spec, arg: &Value) -> String {
    match verb {
        'v' => spec.pad(arg.to_string(), false),
        's' => {
            let mut s = text(arg);
            if let Some(p) = spec.precision {
                s = s.chars().take(p).collect();
            }
            spec.pad(s, false)
        }
        'q' => match arg {
            Value::Int(i) => match char::from_u32(*i as u32) {
                Some(c) => spec.pad(format!("'{}'", c), false),
                None => bad_verb(verb, arg),
            },
            other => spec.pad(go_quote(&text(other)), false),
        },
        't' => match arg {
            Value::Bool(b) => spec.pad(b.to_string(), false),
            other => bad_verb(verb, other),
        },
        'd' => match arg {
            Value::Int(i) => spec.pad(spec.signed(i.to_string(), *i < 0), true),
            other => bad_verb(verb, other),
        },
        'b' | 'o' | 'x' | 'X' => match arg {
            Value::Int(i) => {
                let magnitude = (*i as i128).unsigned_abs();
                let digits = match verb {
                    'b' => format!("{:b}", magnitude),
                    'o' => format!("{:o}", magnitude),
                    'x' => format!("{:x}", magnitude),
                    _ => format!("{:X}", magnitude),
                };
                let body = if *i < 0 { format!("-{}", digits) } else { digits };
                spec.pad(spec.signed(body, *i < 0), true)
            }
            Value::Str(s) if verb == 'x' => spec.pad(hex::encode(s), false),
            Value::Str(s) if verb == 'X' => spec.pad(hex::encode_upper(s), false),
            other => bad_verb(verb, other),
        },
        'c' => match arg {
            Value::Int(i) => match char::from_u32(*i as u32) {
                Some(c) => spec.pad(c.to_string(), false),
                None => bad_verb(verb, arg),
            },
            other => bad_verb(verb, other),
        },
        'f' | 'F' | 'e' | 'g' => {
            let number = match arg {
                Value::Float(f) => *f,
                other => return bad_verb(verb, other),
            };
            let body = match verb {
                'f' | 'F' => format!("{:.*}", spec.precision.unwrap_or(6), number),
                'e' => {
                    let raw = format!("{:.*e}", spec.precision.unwrap_or(6), number);
                    match raw.split_once('e') {
                        Some((mantissa, exp)) => {
                            let (sign, digits) = match exp.strip_prefix('-') {
                                Some(d) => ('-', d),
                                None => ('+', exp),
                            };
                            format!("{}e{}{:0>2}", mantissa, sign, digits)
                        }
                        None => raw,
                    }
                }
                _ => match spec.precision {
                    Some(p) => format!("{:.*}", p, number),
                    None => format_float(number),
                },
            };
            spec.pad(spec.signed(body, number < 0.0), true)
        }
        other => format!("%!{}(bad verb)", other),
    }
}

fn format_number(digits: &str, what: &str) -> std::result::Result<Option<usize>, String> {
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_FORMAT_WIDTH => Ok(Some(n)),
        _ => Err(format!("format {} {} exceeds {}", what, digits, MAX_FORMAT_WIDTH)),
    }
}

/// `fmt.Sprintf` for the common verbs.
///
/// Widths and precisions above [`MAX_FORMAT_WIDTH`] are errors.
pub(crate) fn sprintf(format: &str, args: &[Value]) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    let mut next_arg = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec {
            minus: false,
            plus: false,
            zero: false,
            width: None,
            precision: None,
        };
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }
        let mut width = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(d);
            chars.next();
        }
        spec.width = format_number(&width, "width")?;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                precision.push(d);
                chars.next();
            }
            spec.precision = Some(format_number(&precision, "precision")?.unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        match args.get(next_arg) {
            Some(arg) => out.push_str(&format_arg(verb, &spec, arg)),
            None => out.push_str(&format!("%!{}(MISSING)", verb)),
        }
        next_arg += 1;
    }

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|a| format!("{}={}", a.kind(), a))
            .collect();
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }
    Ok(out)
}

fn printf(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    sprintf(&text(&args[0]), &args[1..]).map(Value::Str)
}

fn list(args: &[Value]) -> FuncResult {
    Ok(Value::List(args.to_vec()))
}

fn dict(args: &[Value]) -> FuncResult {
    let mut map = BTreeMap::new();
    for pair in args.chunks(2) {
        let value = pair.get(1).cloned().unwrap_or_else(|| Value::Str(String::new()));
        map.insert(text(&pair[0]), value);
    }
    Ok(Value::Map(map))
}

fn as_map<'a>(value: &'a Value, func: &str) -> std::result::Result<&'a BTreeMap<String, Value>, String> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(format!("{} expects a map, got {}", func, other.kind())),
    }
}

fn get(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let map = as_map(&args[0], "get")?;
    Ok(map
        .get(&text(&args[1]))
        .cloned()
        .unwrap_or_else(|| Value::Str(String::new())))
}

fn has_key(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let map = as_map(&args[0], "hasKey")?;
    Ok(Value::Bool(map.contains_key(&text(&args[1]))))
}

fn keys(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    let mut names = Vec::new();
    for arg in args {
        names.extend(as_map(arg, "keys")?.keys().cloned());
    }
    names.sort();
    Ok(Value::List(names.into_iter().map(Value::Str).collect()))
}

fn first(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    match &args[0] {
        Value::List(items) => Ok(items.first().cloned().unwrap_or_default()),
        Value::Nil => Ok(Value::Nil),
        other => Err(format!("first expects a list, got {}", other.kind())),
    }
}

fn last(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    match &args[0] {
        Value::List(items) => Ok(items.last().cloned().unwrap_or_default()),
        Value::Nil => Ok(Value::Nil),
        other => Err(format!("last expects a list, got {}", other.kind())),
    }
}

fn index(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    let mut current = args[0].clone();
    for key in &args[1..] {
        current = match &current {
            Value::List(items) => {
                let i = strict_int(key, "index")?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or_else(|| format!("index out of range: {}", i))?
            }
            Value::Str(s) => {
                let i = strict_int(key, "index")?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| s.as_bytes().get(i))
                    .map(|b| Value::Int(*b as i64))
                    .ok_or_else(|| format!("index out of range: {}", i))?
            }
            Value::Map(map) => map.get(&text(key)).cloned().unwrap_or_default(),
            Value::Nil => return Err("index of untyped nil".to_string()),
            other => return Err(format!("can't index item of type {}", other.kind())),
        };
    }
    Ok(current)
}

fn len(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.len(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => return Err(format!("len of type {}", other.kind())),
    };
    Ok(Value::Int(n as i64))
}

fn default(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    if args.len() > 2 {
        return Err(format!("wrong number of args: want 1 or 2 got {}", args.len()));
    }
    match args.get(1) {
        Some(given) if given.is_truthy() => Ok(given.clone()),
        _ => Ok(args[0].clone()),
    }
}

fn empty(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn coalesce(args: &[Value]) -> FuncResult {
    Ok(args.iter().find(|v| v.is_truthy()).cloned().unwrap_or_default())
}

/// Go `eq` semantics: numbers compare by value, other basic kinds must match.
fn equal(a: &Value, b: &Value) -> std::result::Result<bool, String> {
    match (a, b) {
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Nil, _) | (_, Value::Nil) => Ok(false),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(a.as_float() == b.as_float())
        }
        (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => {
            Err(format!("non-comparable types {} and {}", a.kind(), b.kind()))
        }
        _ => Err(format!("incompatible types for comparison: {} and {}", a.kind(), b.kind())),
    }
}

fn eq(args: &[Value]) -> FuncResult {
    want_at_least(args, 2)?;
    for candidate in &args[1..] {
        if equal(&args[0], candidate)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ne(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(!equal(&args[0], &args[1])?))
}

fn compare(a: &Value, b: &Value) -> std::result::Result<std::cmp::Ordering, String> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
            x.partial_cmp(&y).ok_or_else(|| "cannot compare NaN".to_string())
        }
        _ => Err(format!("incompatible types for comparison: {} and {}", a.kind(), b.kind())),
    }
}

fn lt(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_lt()))
}

fn le(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_le()))
}

fn gt(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_gt()))
}

fn ge(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_ge()))
}

fn and(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    Ok(args
        .iter()
        .find(|v| !v.is_truthy())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

fn or(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    Ok(args
        .iter()
        .find(|v| v.is_truthy())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

fn not(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn atoi(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Int(text(&args[0]).trim().parse().unwrap_or(0)))
}

fn int(args: &[Value]) -> FuncResult {
    want(args, 1)?;
    Ok(Value::Int(int_of(&args[0])))
}

fn add(args: &[Value]) -> FuncResult {
    args.iter()
        .try_fold(0i64, |acc, v| acc.checked_add(int_of(v)))
        .map(Value::Int)
        .ok_or_else(overflow)
}

fn sub(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    int_of(&args[0])
        .checked_sub(int_of(&args[1]))
        .map(Value::Int)
        .ok_or_else(overflow)
}

fn mul(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    args.iter()
        .try_fold(1i64, |acc, v| acc.checked_mul(int_of(v)))
        .map(Value::Int)
        .ok_or_else(overflow)
}

fn div(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let divisor = int_of(&args[1]);
    if divisor == 0 {
        return Err("division by zero".to_string());
    }
    int_of(&args[0])
        .checked_div(divisor)
        .map(Value::Int)
        .ok_or_else(overflow)
}

fn modulo(args: &[Value]) -> FuncResult {
    want(args, 2)?;
    let divisor = int_of(&args[1]);
    if divisor == 0 {
        return Err("modulo by zero".to_string());
    }
    int_of(&args[0])
        .checked_rem(divisor)
        .map(Value::Int)
        .ok_or_else(overflow)
}

fn max(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    Ok(Value::Int(args.iter().map(int_of).max().unwrap_or(0)))
}

fn min(args: &[Value]) -> FuncResult {
    want_at_least(args, 1)?;
    Ok(Value::Int(args.iter().map(int_of).min().unwrap_or(0)))
}
