//! Raw random bytes and prefixed hex identifiers.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{lenient, parse_config};
use crate::{encoding, rng};

/// Largest accepted byte count for both generators.
pub const MAX_BYTES: usize = 1024;

fn byte_count(field: &str, n: i64) -> Result<usize> {
    if n < 1 || n > MAX_BYTES as i64 {
        return Err(SantaError::config(
            field,
            format!("{} must be between 1 and {}, got {}", field, MAX_BYTES, n),
        ));
    }
    Ok(n as usize)
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BytesConfig {
    #[serde(deserialize_with = "lenient::integer")]
    length: i64,
}

impl Default for BytesConfig {
    fn default() -> Self {
        Self { length: 16 }
    }
}

/// `random_bytes` generator; the value is standard base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesGenerator;

impl Generator for BytesGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::RandomBytes.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: BytesConfig = parse_config(config)?;
        let bytes = rng::bytes(byte_count("length", settings.length)?)?;

        let mut result = HashMap::new();
        result.insert("value".to_string(), encoding::b64(&bytes));
        result.insert("generatedAt".to_string(), santa_core::time::rfc3339_now());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["value", "generatedAt"]
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct IdConfig {
    #[serde(deserialize_with = "lenient::integer")]
    byte_length: i64,
    #[serde(deserialize_with = "lenient::string")]
    prefix: String,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            byte_length: 8,
            prefix: String::new(),
        }
    }
}

/// `random_id` generator: hex-encoded random bytes behind an optional prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl Generator for IdGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::RandomId.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: IdConfig = parse_config(config)?;
        let bytes = rng::bytes(byte_count("byte_length", settings.byte_length)?)?;

        let mut result = HashMap::new();
        result.insert(
            "value".to_string(),
            format!("{}{}", settings.prefix, encoding::hex(&bytes)),
        );
        result.insert("prefix".to_string(), settings.prefix);
        result.insert("generatedAt".to_string(), santa_core::time::rfc3339_now());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["value", "prefix", "generatedAt"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bytes_length() {
        let out = BytesGenerator.generate(&json!({"length": 48})).unwrap();
        assert_eq!(encoding::b64_decode(&out["value"]).unwrap().len(), 48);

        let out = BytesGenerator.generate(&json!({})).unwrap();
        assert_eq!(encoding::b64_decode(&out["value"]).unwrap().len(), 16);
    }

    #[test]
    fn test_bytes_bounds() {
        assert!(BytesGenerator.generate(&json!({"length": 0})).is_err());
        assert!(BytesGenerator.generate(&json!({"length": 1025})).is_err());
        assert!(BytesGenerator.generate(&json!({"length": 1024})).is_ok());
    }

    #[test]
    fn test_prefixed_id() {
        let out = IdGenerator.generate(&json!({"byte_length": 4, "prefix": "usr_"})).unwrap();
        let value = &out["value"];
        assert!(value.starts_with("usr_"));
        assert_eq!(value.len(), 4 + 8);
        assert!(value[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(out["prefix"], "usr_");
    }

    #[test]
    fn test_id_without_prefix() {
        let out = IdGenerator.generate(&json!({})).unwrap();
        assert_eq!(out["value"].len(), 16);
        assert_eq!(out["prefix"], "");
        let err = IdGenerator.generate(&json!({"byte_length": -1})).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "byte_length"));
        let err = IdGenerator.generate(&json!({"prefix": 7})).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration for `prefix`: expected a string, got a number");
        let out = IdGenerator.generate(&json!({"byte_length": "2"})).unwrap();
        assert_eq!(out["value"].len(), 4);
    }
}
