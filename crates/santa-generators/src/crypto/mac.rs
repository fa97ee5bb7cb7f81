//! HMAC key and signature generation.

use hmac::{Hmac, Mac};
use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Sha256, Sha512};
use std::collections::HashMap;

use crate::config::{lenient, parse_config};
use crate::{encoding, rng};

/// Largest accepted HMAC key in bytes.
pub const MAX_KEY_BYTES: i64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HmacAlgorithm {
    Sha256,
    Sha512,
}

impl HmacAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            HmacAlgorithm::Sha256 => "sha256",
            HmacAlgorithm::Sha512 => "sha512",
        }
    }

    /// Normalise and parse user input.
    ///
    /// Anything outside `[a-z0-9]` is dropped before the name is echoed in an
    /// error so that raw input never reaches a log line.
    fn parse(raw: &str) -> Result<Self> {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return Err(SantaError::config("algorithm", "algorithm cannot be empty"));
        }
        let sanitized: String = lowered
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();
        if sanitized.is_empty() {
            return Err(SantaError::config(
                "algorithm",
                "algorithm contains invalid characters",
            ));
        }
        match sanitized.as_str() {
            "sha256" => Ok(HmacAlgorithm::Sha256),
            "sha512" => Ok(HmacAlgorithm::Sha512),
            other => Err(SantaError::config(
                "algorithm",
                format!("unsupported algorithm: {} (supported: sha256, sha512)", other),
            )),
        }
    }

    fn sign(&self, key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let invalid = |e: hmac::digest::InvalidLength| {
            SantaError::Generation(format!("failed to key HMAC: {}", e))
        };
        Ok(match self {
            HmacAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(invalid)?;
                mac.update(message);
                mac.finalize().into_bytes().to_vec()
            }
            HmacAlgorithm::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(invalid)?;
                mac.update(message);
                mac.finalize().into_bytes().to_vec()
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HmacConfig {
    #[serde(deserialize_with = "lenient::string")]
    algorithm: String,
    #[serde(deserialize_with = "lenient::integer")]
    key_size: i64,
    #[serde(deserialize_with = "lenient::string")]
    message: String,
}

impl Default for HmacConfig {
    fn default() -> Self {
        Self {
            algorithm: "sha256".to_string(),
            key_size: 32,
            message: String::new(),
        }
    }
}

impl HmacConfig {
    fn key_bytes(&self) -> Result<usize> {
        if self.key_size <= 0 {
            return Err(SantaError::config("key_size", "key_size must be positive"));
        }
        if self.key_size > MAX_KEY_BYTES {
            return Err(SantaError::config(
                "key_size",
                format!("key_size too large, maximum {} bytes", MAX_KEY_BYTES),
            ));
        }
        Ok(self.key_size as usize)
    }
}

/// `crypto_hmac` generator: a random key plus its HMAC over `message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacGenerator;

impl Generator for HmacGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::Hmac.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: HmacConfig = parse_config(config)?;
        let algorithm = HmacAlgorithm::parse(&settings.algorithm)?;
        let key = rng::bytes(settings.key_bytes()?)?;
        let signature = algorithm.sign(&key, settings.message.as_bytes())?;

        let mut result = HashMap::new();
        result.insert("key_base64".to_string(), encoding::b64(&key));
        result.insert("key_hex".to_string(), encoding::hex(&key));
        result.insert("signature_base64".to_string(), encoding::b64(&signature));
        result.insert("signature_hex".to_string(), encoding::hex(&signature));
        result.insert("algorithm".to_string(), algorithm.name().to_string());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["key_base64", "key_hex", "signature_base64", "signature_hex", "algorithm"]
    }
}
