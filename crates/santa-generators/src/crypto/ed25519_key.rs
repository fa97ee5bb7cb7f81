//! Ed25519 key pairs.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result};
use serde_json::Value;
use std::collections::HashMap;

use super::keys::{KeySpec, PrivateKey};

/// `crypto_ed25519_key` generator. Takes no configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519KeyGenerator;

impl Generator for Ed25519KeyGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::Ed25519Key.type_name()
    }

    fn generate(&self, _config: &Value) -> Result<GeneratorOutput> {
        let key = PrivateKey::generate(KeySpec::Ed25519)?;
        let mut result = HashMap::new();
        super::insert_pem_pair(&mut result, &key)?;
        result.insert("algorithm".to_string(), key.algorithm().to_string());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &[
            "private_key_pem",
            "public_key_pem",
            "private_key_base64",
            "public_key_base64",
            "algorithm",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::pkcs8::DecodePublicKey;
    use ed25519_dalek::{Signer, Verifier, VerifyingKey};
    use serde_json::json;

    #[test]
    fn test_pair_signs_and_verifies() {
        let out = Ed25519KeyGenerator.generate(&json!({})).unwrap();
        assert_eq!(out["algorithm"], "ED25519");

        let key = PrivateKey::from_pem(&out["private_key_pem"], "private_key_pem").unwrap();
        let PrivateKey::Ed25519(signing) = key else {
            panic!("expected an Ed25519 key");
        };
        let verifying = VerifyingKey::from_public_key_pem(&out["public_key_pem"]).unwrap();
        let signature = signing.sign(b"payload");
        assert!(verifying.verify(b"payload", &signature).is_ok());
    }
}
