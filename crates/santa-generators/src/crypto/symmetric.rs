//! AES and ChaCha-family keys.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{lenient, parse_config};
use crate::{encoding, rng};

const AES_KEY_SIZES: [u32; 3] = [128, 192, 256];

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AesConfig {
    #[serde(deserialize_with = "lenient::integer")]
    key_size: i64,
}

impl Default for AesConfig {
    fn default() -> Self {
        Self { key_size: 256 }
    }
}

impl AesConfig {
    fn bits(&self) -> Result<u32> {
        match u32::try_from(self.key_size) {
            Ok(bits) if AES_KEY_SIZES.contains(&bits) => Ok(bits),
            _ => Err(SantaError::config(
                "key_size",
                format!("AES key size must be 128, 192 or 256 bits, got {}", self.key_size),
            )),
        }
    }
}

fn key_output(key: &[u8], bits: u32) -> GeneratorOutput {
    let mut result = HashMap::new();
    result.insert("key_base64".to_string(), encoding::b64(key));
    result.insert("key_hex".to_string(), encoding::hex(key));
    result.insert("key_size".to_string(), bits.to_string());
    result
}

/// `crypto_aes_key` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesKeyGenerator;

impl Generator for AesKeyGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::AesKey.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let bits = parse_config::<AesConfig>(config)?.bits()?;
        let key = rng::bytes(bits as usize / 8)?;
        Ok(key_output(&key, bits))
    }

    fn output_keys(&self) -> &[&'static str] {
        &["key_base64", "key_hex", "key_size"]
    }
}

/// Stream ciphers sharing the 256-bit random key generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCipher {
    /// ChaCha20 (RFC 8439)
    ChaCha20,
    /// XChaCha20, extended nonce
    XChaCha20,
}

impl StreamCipher {
    /// Name reported in the `algorithm` field.
    pub fn name(&self) -> &'static str {
        match self {
            StreamCipher::ChaCha20 => "ChaCha20",
            StreamCipher::XChaCha20 => "XChaCha20",
        }
    }

    fn kind(&self) -> GeneratorKind {
        match self {
            StreamCipher::ChaCha20 => GeneratorKind::ChaCha20Key,
            StreamCipher::XChaCha20 => GeneratorKind::XChaCha20Key,
        }
    }
}

/// `crypto_chacha20_key` / `crypto_xchacha20_key` generator. Takes no configuration.
#[derive(Debug, Clone, Copy)]
pub struct StreamCipherKeyGenerator {
    cipher: StreamCipher,
}

impl StreamCipherKeyGenerator {
    /// Generator tagged with `cipher`.
    pub fn new(cipher: StreamCipher) -> Self {
        Self { cipher }
    }
}

impl Generator for StreamCipherKeyGenerator {
    fn type_name(&self) -> &'static str {
        self.cipher.kind().type_name()
    }

    fn generate(&self, _config: &Value) -> Result<GeneratorOutput> {
        let key = rng::array::<32>()?;
        let mut result = key_output(&key, 256);
        result.insert("algorithm".to_string(), self.cipher.name().to_string());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["key_base64", "key_hex", "key_size", "algorithm"]
    }
}
