//! ECDSA key pairs on the NIST curves.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::keys::{EcCurve, KeySpec, PrivateKey};
use crate::config::{lenient, parse_config};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EcdsaConfig {
    #[serde(deserialize_with = "lenient::string")]
    curve: String,
}

impl Default for EcdsaConfig {
    fn default() -> Self {
        Self {
            curve: "P256".to_string(),
        }
    }
}

/// `crypto_ecdsa_key` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaKeyGenerator;

impl Generator for EcdsaKeyGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::EcdsaKey.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: EcdsaConfig = parse_config(config)?;
        let curve = EcCurve::parse("curve", &settings.curve)?;
        let key = PrivateKey::generate(KeySpec::Ec(curve))?;

        let mut result = HashMap::new();
        super::insert_pem_pair(&mut result, &key)?;
        result.insert("curve".to_string(), curve.to_string());
        result.insert("algorithm".to_string(), key.algorithm().to_string());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &[
            "private_key_pem",
            "public_key_pem",
            "private_key_base64",
            "public_key_base64",
            "curve",
            "algorithm",
        ]
    }
}
