//! Integer-in-range generator.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{lenient, parse_config};
use crate::rng;

/// Inclusive range settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntegerConfig {
    /// Lower bound, inclusive
    #[serde(deserialize_with = "lenient::integer")]
    pub min: i64,
    /// Upper bound, inclusive
    #[serde(deserialize_with = "lenient::integer")]
    pub max: i64,
}

impl Default for IntegerConfig {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

impl IntegerConfig {
    fn checked(self) -> Result<Self> {
        if self.min > self.max {
            return Err(SantaError::config(
                "min",
                format!("min ({}) cannot be greater than max ({})", self.min, self.max),
            ));
        }
        Ok(self)
    }
}

/// `random_integer` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerGenerator;

impl Generator for IntegerGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::RandomInteger.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let IntegerConfig { min, max } = parse_config::<IntegerConfig>(config)?.checked()?;
        let value = rng::inclusive_i64(min, max);

        let mut result = HashMap::new();
        result.insert("value".to_string(), value.to_string());
        result.insert("min".to_string(), min.to_string());
        result.insert("max".to_string(), max.to_string());
        result.insert("generatedAt".to_string(), santa_core::time::rfc3339_now());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["value", "min", "max", "generatedAt"]
    }
}
