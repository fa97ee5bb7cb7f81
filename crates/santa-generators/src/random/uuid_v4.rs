//! UUIDv4 generator.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result};
use serde::de::IgnoredAny;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::parse_config;
use crate::rng;

/// `random_uuid` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl Generator for UuidGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::RandomUuid.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        parse_config::<IgnoredAny>(config)?;

        let id = uuid::Builder::from_random_bytes(rng::array::<16>()?).into_uuid();

        let mut result = HashMap::new();
        result.insert("value".to_string(), id.hyphenated().to_string());
        result.insert("version".to_string(), "4".to_string());
        result.insert("variant".to_string(), "RFC4122".to_string());
        result.insert("generatedAt".to_string(), santa_core::time::rfc3339_now());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["value", "version", "variant", "generatedAt"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uuid_v4() {
        let out = UuidGenerator.generate(&json!({})).unwrap();
        let parsed = uuid::Uuid::parse_str(&out["value"]).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(parsed.get_variant(), uuid::Variant::RFC4122);
        assert_eq!(out["value"].len(), 36);
        assert_eq!(out["version"], "4");
    }

    #[test]
    fn test_uuids_differ() {
        let a = UuidGenerator.generate(&Value::Null).unwrap();
        let b = UuidGenerator.generate(&Value::Null).unwrap();
        assert_ne!(a["value"], b["value"]);
    }

    #[test]
    fn test_settings_must_be_an_object() {
        assert!(UuidGenerator.generate(&json!({"unused": 1})).is_ok());
        assert!(matches!(
            UuidGenerator.generate(&json!("v4")),
            Err(santa_types::SantaError::Parse(_))
        ));
    }
}
