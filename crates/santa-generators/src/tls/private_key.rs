//! `tls_private_key`: a key pair for later CSR or certificate use.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, KeyAlgorithm, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::ssh;
use crate::config::{lenient, parse_config};
use crate::crypto::keys::check_rsa_bits;
use crate::crypto::{EcCurve, KeySpec, PrivateKey};

/// Config field names that select a key: algorithm, RSA size and ECDSA curve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyFields {
    pub algorithm: &'static str,
    pub size: &'static str,
    pub curve: &'static str,
}

/// Resolve an algorithm name plus its size or curve into a key spec,
/// blaming the field in `fields` that holds the bad value.
pub(crate) fn key_spec(fields: KeyFields, algorithm: &str, size: i64, curve: &str) -> Result<KeySpec> {
    let parsed: KeyAlgorithm = algorithm.parse().map_err(|_| {
        SantaError::config(
            fields.algorithm,
            format!("unsupported key algorithm: {} (expected RSA, ECDSA or ED25519)", algorithm.trim()),
        )
    })?;
    Ok(match parsed {
        KeyAlgorithm::Rsa => KeySpec::Rsa(check_rsa_bits(fields.size, size)?),
        KeyAlgorithm::Ecdsa => KeySpec::Ec(EcCurve::parse(fields.curve, curve)?),
        KeyAlgorithm::Ed25519 => KeySpec::Ed25519,
    })
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PrivateKeyConfig {
    #[serde(deserialize_with = "lenient::string")]
    algorithm: String,
    #[serde(deserialize_with = "lenient::integer")]
    rsa_bits: i64,
    #[serde(deserialize_with = "lenient::string")]
    ecdsa_curve: String,
}

impl Default for PrivateKeyConfig {
    fn default() -> Self {
        Self {
            algorithm: "RSA".to_string(),
            rsa_bits: 2048,
            ecdsa_curve: "P224".to_string(),
        }
    }
}

impl PrivateKeyConfig {
    const FIELDS: KeyFields = KeyFields {
        algorithm: "algorithm",
        size: "rsa_bits",
        curve: "ecdsa_curve",
    };

    fn spec(&self) -> Result<KeySpec> {
        key_spec(Self::FIELDS, &self.algorithm, self.rsa_bits, &self.ecdsa_curve)
    }
}

/// `tls_private_key` generator.
///
/// RSA keys are additionally rendered as an OpenSSH public key with MD5 and
/// SHA256 fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateKeyGenerator;

impl Generator for PrivateKeyGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::TlsPrivateKey.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: PrivateKeyConfig = parse_config(config)?;
        let key = PrivateKey::generate(settings.spec()?)?;

        let mut result = HashMap::new();
        result.insert("private_key_pem".to_string(), key.to_traditional_pem()?);
        result.insert("private_key_pem_pkcs8".to_string(), key.to_pkcs8_pem()?);
        result.insert("public_key_pem".to_string(), key.public_key_pem()?);
        result.insert("algorithm".to_string(), key.algorithm().to_string());

        if let Some(rsa) = key.as_rsa() {
            let blob = ssh::rsa_public_blob(rsa);
            result.insert("public_key_openssh".to_string(), ssh::authorized_key(&blob));
            result.insert("public_key_fingerprint_md5".to_string(), ssh::md5_fingerprint(&blob));
            result.insert(
                "public_key_fingerprint_sha256".to_string(),
                ssh::sha256_fingerprint(&blob),
            );
        }
        if let Some(curve) = key.curve() {
            result.insert("curve".to_string(), curve.to_string());
        }
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &[
            "private_key_pem",
            "private_key_pem_pkcs8",
            "public_key_pem",
            "algorithm",
            "public_key_openssh",
            "public_key_fingerprint_md5",
            "public_key_fingerprint_sha256",
            "curve",
        ]
    }
}
