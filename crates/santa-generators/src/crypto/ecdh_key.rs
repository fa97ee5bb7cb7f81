//! ECDH key agreement pairs.
//!
//! NIST curve keys reuse [`PrivateKey`]; X25519 keys are wrapped in the
//! RFC 8410 PKCS#8 and SPKI structures.

use pkcs8::der::asn1::{BitStringRef, OctetStringRef};
use pkcs8::der::oid::db::rfc8410::ID_X_25519;
use pkcs8::der::Encode;
use pkcs8::spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};
use pkcs8::PrivateKeyInfo;
use rand::rngs::OsRng;
use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};

use super::keys::{EcCurve, KeySpec, PrivateKey};
use crate::config::{lenient, parse_config};
use crate::encoding::{self, PKCS8_LABEL, PUBLIC_KEY_LABEL};

/// Curves accepted for ECDH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdhCurve {
    /// NIST curve
    Nist(EcCurve),
    /// Curve25519
    X25519,
}

impl EcdhCurve {
    fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_uppercase();
        match normalized.as_str() {
            "X25519" => Ok(EcdhCurve::X25519),
            "P256" | "P384" | "P521" => normalized
                .parse()
                .map(EcdhCurve::Nist)
                .map_err(|_| unsupported(raw)),
            _ => Err(unsupported(raw)),
        }
    }
}

fn unsupported(raw: &str) -> SantaError {
    SantaError::config(
        "curve",
        format!("unsupported ECDH curve: {} (supported: P256, P384, P521, X25519)", raw.trim()),
    )
}

impl fmt::Display for EcdhCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcdhCurve::Nist(curve) => write!(f, "{}", curve),
            EcdhCurve::X25519 => f.write_str("X25519"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EcdhConfig {
    #[serde(deserialize_with = "lenient::string")]
    curve: String,
}

impl Default for EcdhConfig {
    fn default() -> Self {
        Self {
            curve: "P256".to_string(),
        }
    }
}

struct RawPair {
    private_pem: String,
    public_pem: String,
    private_raw: Vec<u8>,
    public_raw: Vec<u8>,
}

const X25519_ALGORITHM: AlgorithmIdentifierRef<'static> = AlgorithmIdentifierRef {
    oid: ID_X_25519,
    parameters: None,
};

fn der_err(e: pkcs8::der::Error) -> SantaError {
    SantaError::Generation(format!("failed to encode X25519 key: {}", e))
}

fn x25519_pair() -> Result<RawPair> {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    // The PKCS#8 privateKey holds a CurvePrivateKey, itself an OCTET STRING.
    let curve_private_key = OctetStringRef::new(secret.as_bytes())
        .and_then(|octets| octets.to_der())
        .map_err(der_err)?;
    let private_der = PrivateKeyInfo::new(X25519_ALGORITHM, &curve_private_key)
        .to_der()
        .map_err(der_err)?;
    let public_der = SubjectPublicKeyInfoRef {
        algorithm: X25519_ALGORITHM,
        subject_public_key: BitStringRef::from_bytes(public.as_bytes()).map_err(der_err)?,
    }
    .to_der()
    .map_err(der_err)?;

    Ok(RawPair {
        private_pem: encoding::pem_encode(PKCS8_LABEL, &private_der),
        public_pem: encoding::pem_encode(PUBLIC_KEY_LABEL, &public_der),
        private_raw: secret.to_bytes().to_vec(),
        public_raw: public.to_bytes().to_vec(),
    })
}

fn nist_pair(curve: EcCurve) -> Result<RawPair> {
    let key = PrivateKey::generate(KeySpec::Ec(curve))?;
    let missing = || SantaError::Generation(format!("no raw key material for {} key", curve));
    Ok(RawPair {
        private_pem: key.to_pkcs8_pem()?,
        public_pem: key.public_key_pem()?,
        private_raw: key.raw_private_bytes().ok_or_else(missing)?,
        public_raw: key.raw_public_bytes().ok_or_else(missing)?,
    })
}

/// `crypto_ecdh_key` generator.
///
/// `private_key_base64` is the raw scalar; `public_key_base64` is the
/// uncompressed point, or the u-coordinate for X25519.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdhKeyGenerator;

impl Generator for EcdhKeyGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::EcdhKey.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: EcdhConfig = parse_config(config)?;
        let curve = EcdhCurve::parse(&settings.curve)?;
        let pair = match curve {
            EcdhCurve::X25519 => x25519_pair()?,
            EcdhCurve::Nist(curve) => nist_pair(curve)?,
        };

        let mut result = HashMap::new();
        result.insert("private_key_pem".to_string(), pair.private_pem);
        result.insert("public_key_pem".to_string(), pair.public_pem);
        result.insert("private_key_base64".to_string(), encoding::b64(&pair.private_raw));
        result.insert("public_key_base64".to_string(), encoding::b64(&pair.public_raw));
        result.insert("curve".to_string(), curve.to_string());
        result.insert("algorithm".to_string(), "ECDH".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nist_raw_lengths() {
        for (curve, scalar, point) in [("P256", 32, 65), ("p384", 48, 97), ("P521", 66, 133)] {
            let out = EcdhKeyGenerator.generate(&json!({ "curve": curve })).unwrap();
            assert_eq!(out["curve"], curve.to_uppercase());
            assert_eq!(encoding::b64_decode(&out["private_key_base64"]).unwrap().len(), scalar);
            let public = encoding::b64_decode(&out["public_key_base64"]).unwrap();
            assert_eq!(public.len(), point);
            assert_eq!(public[0], 0x04);
        }
    }

    #[test]
    fn test_x25519_agreement() {
        let alice = EcdhKeyGenerator.generate(&json!({"curve": "x25519"})).unwrap();
        let bob = EcdhKeyGenerator.generate(&json!({"curve": "X25519"})).unwrap();
        assert_eq!(alice["curve"], "X25519");
        assert_eq!(alice["algorithm"], "ECDH");

        let raw = |out: &GeneratorOutput, key: &str| -> [u8; 32] {
            encoding::b64_decode(&out[key]).unwrap().try_into().unwrap()
        };
        let alice_secret = StaticSecret::from(raw(&alice, "private_key_base64"));
        let bob_secret = StaticSecret::from(raw(&bob, "private_key_base64"));
        let ab = alice_secret.diffie_hellman(&PublicKey::from(raw(&bob, "public_key_base64")));
        let ba = bob_secret.diffie_hellman(&PublicKey::from(raw(&alice, "public_key_base64")));
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_x25519_pem_shape() {
        let out = EcdhKeyGenerator.generate(&json!({"curve": "X25519"})).unwrap();
        let private = encoding::pem_decode_single(&out["private_key_pem"], "private_key_pem").unwrap();
        assert_eq!(private.tag(), "PRIVATE KEY");
        assert_eq!(private.contents().len(), 48);
        assert_eq!(&private.contents()[32..], encoding::b64_decode(&out["private_key_base64"]).unwrap().as_slice());
        let public = encoding::pem_decode_single(&out["public_key_pem"], "public_key_pem").unwrap();
        assert_eq!(public.contents().len(), 44);
    }

    #[test]
    fn test_x25519_structures_decode() {
        use pkcs8::der::Decode;

        let out = EcdhKeyGenerator.generate(&json!({"curve": "X25519"})).unwrap();
        let private = encoding::pem_decode_single(&out["private_key_pem"], "private_key_pem").unwrap();
        let info = PrivateKeyInfo::from_der(private.contents()).unwrap();
        assert_eq!(info.algorithm.oid, ID_X_25519);
        assert!(info.algorithm.parameters.is_none());
        let scalar = OctetStringRef::from_der(info.private_key).unwrap();
        let secret: [u8; 32] = scalar.as_bytes().try_into().unwrap();

        let public = encoding::pem_decode_single(&out["public_key_pem"], "public_key_pem").unwrap();
        let spki = SubjectPublicKeyInfoRef::from_der(public.contents()).unwrap();
        assert_eq!(spki.algorithm.oid, ID_X_25519);
        let point = spki.subject_public_key.as_bytes().unwrap();
        assert_eq!(point, PublicKey::from(&StaticSecret::from(secret)).as_bytes());
    }

    #[test]
    fn test_p224_is_not_an_ecdh_curve() {
        let err = EcdhKeyGenerator.generate(&json!({"curve": "P224"})).unwrap_err();
        assert!(err.to_string().contains("unsupported ECDH curve: P224"));
        let err = EcdhKeyGenerator.generate(&json!({"curve": ["X25519"]})).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "curve"));
    }
}
