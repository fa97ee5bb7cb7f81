//! Password and random string generators.
//!
//! Both draw `length` characters uniformly from a charset assembled out of
//! the enabled character classes.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{lenient, parse_config};
use crate::rng;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &str = "0123456789";

/// Special characters used when `override_special` is not set.
pub const DEFAULT_SPECIAL: &str = "!@#$%&*()-_=+[]{}<>:?";

/// Largest accepted `length`.
pub const MAX_LENGTH: usize = 10_000;

/// Settings shared by `random_password` and `random_string`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CharsetConfig {
    /// Number of characters to draw
    #[serde(deserialize_with = "lenient::integer")]
    pub length: usize,
    /// Include `a-z`
    #[serde(deserialize_with = "lenient::boolean")]
    pub lower: bool,
    /// Include `A-Z`
    #[serde(deserialize_with = "lenient::boolean")]
    pub upper: bool,
    /// Include `0-9`
    #[serde(deserialize_with = "lenient::boolean")]
    pub numeric: bool,
    /// Include special characters
    #[serde(deserialize_with = "lenient::boolean")]
    pub special: bool,
    /// Replaces the default special set when non-empty
    #[serde(deserialize_with = "lenient::string")]
    pub override_special: String,
}

impl Default for CharsetConfig {
    fn default() -> Self {
        Self {
            length: 16,
            lower: true,
            upper: true,
            numeric: true,
            special: true,
            override_special: String::new(),
        }
    }
}

impl CharsetConfig {
    /// Concatenated charset of every enabled class.
    pub fn charset(&self) -> String {
        let mut charset = String::new();
        if self.lower {
            charset.push_str(LOWER);
        }
        if self.upper {
            charset.push_str(UPPER);
        }
        if self.numeric {
            charset.push_str(NUMERIC);
        }
        if self.special {
            if self.override_special.is_empty() {
                charset.push_str(DEFAULT_SPECIAL);
            } else {
                charset.push_str(&self.override_special);
            }
        }
        charset
    }

    /// Draw a value; returns `(value, charset)`.
    pub fn draw(&self) -> Result<(String, String)> {
        if self.length < 1 || self.length > MAX_LENGTH {
            return Err(SantaError::config(
                "length",
                format!("length must be between 1 and {}, got {}", MAX_LENGTH, self.length),
            ));
        }
        let charset = self.charset();
        let chars: Vec<char> = charset.chars().collect();
        if chars.is_empty() {
            return Err(SantaError::config(
                "charset",
                "no character types enabled (lower, upper, numeric and special are all off)",
            ));
        }

        let value = (0..self.length).map(|_| chars[rng::index(chars.len())]).collect();
        Ok((value, charset))
    }
}

fn generate_from_charset(config: &Value) -> Result<GeneratorOutput> {
    let settings: CharsetConfig = parse_config(config)?;
    let (value, charset) = settings.draw()?;

    let mut result = HashMap::new();
    result.insert("value".to_string(), value);
    result.insert("charset".to_string(), charset);
    result.insert("generatedAt".to_string(), santa_core::time::rfc3339_now());
    Ok(result)
}

const OUTPUT_KEYS: &[&str] = &["value", "charset", "generatedAt"];

/// `random_password` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordGenerator;

impl Generator for PasswordGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::RandomPassword.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        generate_from_charset(config)
    }

    fn output_keys(&self) -> &[&'static str] {
        OUTPUT_KEYS
    }
}

/// `random_string` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringGenerator;

impl Generator for StringGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::RandomString.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        generate_from_charset(config)
    }

    fn output_keys(&self) -> &[&'static str] {
        OUTPUT_KEYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_default_password() {
        let out = PasswordGenerator.generate(&json!({})).unwrap();
        assert_eq!(out["value"].chars().count(), 16);
        assert_eq!(out["charset"], format!("{}{}{}{}", LOWER, UPPER, NUMERIC, DEFAULT_SPECIAL));
        assert!(chrono::DateTime::parse_from_rfc3339(&out["generatedAt"]).is_ok());
    }

    #[test]
    fn test_numeric_only() {
        let out = StringGenerator
            .generate(&json!({"length": 40, "lower": false, "upper": false, "special": false}))
            .unwrap();
        assert_eq!(out["charset"], NUMERIC);
        assert!(out["value"].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(out["value"].len(), 40);
    }

    #[test]
    fn test_override_special() {
        let out = PasswordGenerator
            .generate(&json!({"lower": false, "upper": false, "numeric": false, "override_special": "#"}))
            .unwrap();
        assert_eq!(out["value"], "#".repeat(16));
    }

    #[test]
    fn test_length_bounds() {
        for bad in [0, -3, 10_001] {
            let err = PasswordGenerator.generate(&json!({ "length": bad })).unwrap_err();
            assert!(matches!(err, SantaError::Config { ref field, .. } if field == "length"));
        }
        let out = PasswordGenerator.generate(&json!({"length": 10_000})).unwrap();
        assert_eq!(out["value"].chars().count(), 10_000);

        let out = PasswordGenerator.generate(&json!({"length": "12", "special": "false"})).unwrap();
        assert_eq!(out["value"].chars().count(), 12);
        let err = PasswordGenerator.generate(&json!({"lower": "no"})).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "lower"));
    }

    #[test]
    fn test_empty_charset_rejected() {
        let err = StringGenerator
            .generate(&json!({"lower": false, "upper": false, "numeric": false, "special": false}))
            .unwrap_err();
        assert!(err.to_string().contains("no character types enabled"));
    }

    proptest! {
        #[test]
        fn prop_value_drawn_from_charset(length in 1usize..200, lower: bool, upper: bool, numeric: bool) {
            let settings = CharsetConfig { length, lower, upper, numeric, special: true, ..Default::default() };
            let (value, charset) = settings.draw().unwrap();
            prop_assert_eq!(value.chars().count(), length);
            prop_assert!(value.chars().all(|c| charset.contains(c)));
        }
    }
}
