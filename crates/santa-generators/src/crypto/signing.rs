//! X.509 signing and signature checks for every [`PrivateKey`] flavour.
//!
//! RSA signs PKCS#1 v1.5 with SHA-256. ECDSA pairs each curve with the
//! digest of matching strength (P-224/SHA-224 through P-521/SHA-512) and
//! emits DER signatures. Ed25519 signs the message directly.

use ed25519_dalek::Signature as Ed25519Signature;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use santa_types::{Result, SantaError};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use signature::{Keypair, Signer};
use x509_cert::der::asn1::{Any, BitString};
use x509_cert::der::oid::db::{rfc5912, rfc8410};
use x509_cert::der::Decode;
use x509_cert::spki::{
    self, AlgorithmIdentifierOwned, Document, DynSignatureAlgorithmIdentifier, EncodePublicKey,
    ObjectIdentifier, SignatureBitStringEncoding, SubjectPublicKeyInfoOwned,
};

use super::PrivateKey;

/// DER SubjectPublicKeyInfo of a signer's public half.
#[derive(Debug, Clone)]
pub struct PublicKeyDocument(Vec<u8>);

impl EncodePublicKey for PublicKeyDocument {
    fn to_public_key_der(&self) -> spki::Result<Document> {
        Ok(Document::from_der(&self.0)?)
    }
}

/// Signature bytes as they go into the certificate's BIT STRING.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignature(Vec<u8>);

impl RawSignature {
    /// Signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl SignatureBitStringEncoding for RawSignature {
    fn to_bitstring(&self) -> x509_cert::der::Result<BitString> {
        BitString::from_bytes(&self.0)
    }
}

/// A private key borrowed for certificate and request signing.
#[derive(Debug)]
pub struct KeySigner<'a> {
    key: &'a PrivateKey,
    public_key: PublicKeyDocument,
}

impl<'a> KeySigner<'a> {
    /// Wrap `key`, encoding its public half once up front.
    pub fn new(key: &'a PrivateKey) -> Result<Self> {
        Ok(Self {
            key,
            public_key: PublicKeyDocument(key.public_key_der()?),
        })
    }

    /// Signature algorithm identifier this signer writes into certificates.
    pub fn algorithm(&self) -> AlgorithmIdentifierOwned {
        let (oid, parameters) = match self.key {
            PrivateKey::Rsa(_) => (rfc5912::SHA_256_WITH_RSA_ENCRYPTION, Some(Any::null())),
            PrivateKey::P224(_) => (rfc5912::ECDSA_WITH_SHA_224, None),
            PrivateKey::P256(_) => (rfc5912::ECDSA_WITH_SHA_256, None),
            PrivateKey::P384(_) => (rfc5912::ECDSA_WITH_SHA_384, None),
            PrivateKey::P521(_) => (rfc5912::ECDSA_WITH_SHA_512, None),
            PrivateKey::Ed25519(_) => (rfc8410::ID_ED_25519, None),
        };
        AlgorithmIdentifierOwned { oid, parameters }
    }
}

impl Keypair for KeySigner<'_> {
    type VerifyingKey = PublicKeyDocument;

    fn verifying_key(&self) -> PublicKeyDocument {
        self.public_key.clone()
    }
}

impl DynSignatureAlgorithmIdentifier for KeySigner<'_> {
    fn signature_algorithm_identifier(&self) -> spki::Result<AlgorithmIdentifierOwned> {
        Ok(self.algorithm())
    }
}

impl Signer<RawSignature> for KeySigner<'_> {
    fn try_sign(&self, msg: &[u8]) -> std::result::Result<RawSignature, signature::Error> {
        let bytes = match self.key {
            PrivateKey::Rsa(k) => k
                .sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(msg))
                .map_err(|e| {
                    tracing::warn!(error = %e, "RSA signing failed");
                    signature::Error::new()
                })?,
            PrivateKey::P224(k) => {
                let signer = p224::ecdsa::SigningKey::from(k);
                Signer::<p224::ecdsa::DerSignature>::try_sign(&signer, msg)?
                    .as_bytes()
                    .to_vec()
            }
            PrivateKey::P256(k) => {
                let signer = p256::ecdsa::SigningKey::from(k);
                Signer::<p256::ecdsa::DerSignature>::try_sign(&signer, msg)?
                    .as_bytes()
                    .to_vec()
            }
            PrivateKey::P384(k) => {
                let signer = p384::ecdsa::SigningKey::from(k);
                Signer::<p384::ecdsa::DerSignature>::try_sign(&signer, msg)?
                    .as_bytes()
                    .to_vec()
            }
            PrivateKey::P521(k) => {
                let signer = p521::ecdsa::SigningKey::from_bytes(&k.to_bytes())?;
                Signer::<p521::ecdsa::Signature>::try_sign(&signer, msg)?
                    .to_der()
                    .as_bytes()
                    .to_vec()
            }
            PrivateKey::Ed25519(k) => Signer::<Ed25519Signature>::try_sign(k, msg)?
                .to_bytes()
                .to_vec(),
        };
        Ok(RawSignature(bytes))
    }
}

macro_rules! ecdsa_verify {
    ($curve:ident, $point:expr, $digest:expr, $signature:expr) => {
        match (
            $curve::ecdsa::VerifyingKey::from_sec1_bytes($point),
            $curve::ecdsa::Signature::from_der($signature),
        ) {
            (Ok(key), Ok(sig)) => key.verify_prehash($digest, &sig).is_ok(),
            _ => false,
        }
    };
}

fn unsupported(algorithm: &ObjectIdentifier, key: &str) -> SantaError {
    SantaError::Parse(format!(
        "unsupported signature algorithm {} for {} public key",
        algorithm, key
    ))
}

fn rsa_scheme(algorithm: &ObjectIdentifier, message: &[u8]) -> Option<(Pkcs1v15Sign, Vec<u8>)> {
    let pair = if *algorithm == rfc5912::SHA_224_WITH_RSA_ENCRYPTION {
        (Pkcs1v15Sign::new::<Sha224>(), Sha224::digest(message).to_vec())
    } else if *algorithm == rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
        (Pkcs1v15Sign::new::<Sha256>(), Sha256::digest(message).to_vec())
    } else if *algorithm == rfc5912::SHA_384_WITH_RSA_ENCRYPTION {
        (Pkcs1v15Sign::new::<Sha384>(), Sha384::digest(message).to_vec())
    } else if *algorithm == rfc5912::SHA_512_WITH_RSA_ENCRYPTION {
        (Pkcs1v15Sign::new::<Sha512>(), Sha512::digest(message).to_vec())
    } else {
        return None;
    };
    Some(pair)
}

fn ecdsa_digest(algorithm: &ObjectIdentifier, message: &[u8]) -> Option<Vec<u8>> {
    let digest = if *algorithm == rfc5912::ECDSA_WITH_SHA_224 {
        Sha224::digest(message).to_vec()
    } else if *algorithm == rfc5912::ECDSA_WITH_SHA_256 {
        Sha256::digest(message).to_vec()
    } else if *algorithm == rfc5912::ECDSA_WITH_SHA_384 {
        Sha384::digest(message).to_vec()
    } else if *algorithm == rfc5912::ECDSA_WITH_SHA_512 {
        Sha512::digest(message).to_vec()
    } else {
        return None;
    };
    Some(digest)
}

/// Check `signature` over `message` against the DER public key `spki_der`.
///
/// Returns `Ok(false)` for a well-formed but wrong signature. A key type,
/// curve or signature algorithm outside RSA, ECDSA P-224..P-521 and
/// Ed25519 is a parse error, never a verification failure.
pub fn verify_signature(
    spki_der: &[u8],
    algorithm: &ObjectIdentifier,
    message: &[u8],
    signature: &[u8],
) -> Result<bool> {
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der)
        .map_err(|e| SantaError::Parse(format!("failed to parse public key: {}", e)))?;
    let key_oid = spki.algorithm.oid;
    let key_bits = spki.subject_public_key.raw_bytes();

    if key_oid == rfc5912::RSA_ENCRYPTION {
        let key = RsaPublicKey::from_public_key_der(spki_der)
            .map_err(|e| SantaError::Parse(format!("failed to parse RSA public key: {}", e)))?;
        let (scheme, digest) =
            rsa_scheme(algorithm, message).ok_or_else(|| unsupported(algorithm, "RSA"))?;
        return Ok(key.verify(scheme, &digest, signature).is_ok());
    }

    if key_oid == rfc5912::ID_EC_PUBLIC_KEY {
        let curve = spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|p| p.decode_as::<ObjectIdentifier>().ok())
            .ok_or_else(|| SantaError::Parse("EC public key has no named curve".to_string()))?;
        let digest =
            ecdsa_digest(algorithm, message).ok_or_else(|| unsupported(algorithm, "ECDSA"))?;
        let valid = if curve == rfc5912::SECP_224_R_1 {
            ecdsa_verify!(p224, key_bits, &digest, signature)
        } else if curve == rfc5912::SECP_256_R_1 {
            ecdsa_verify!(p256, key_bits, &digest, signature)
        } else if curve == rfc5912::SECP_384_R_1 {
            ecdsa_verify!(p384, key_bits, &digest, signature)
        } else if curve == rfc5912::SECP_521_R_1 {
            ecdsa_verify!(p521, key_bits, &digest, signature)
        } else {
            return Err(SantaError::Parse(format!("unsupported EC curve {}", curve)));
        };
        return Ok(valid);
    }

    if key_oid == rfc8410::ID_ED_25519 {
        if *algorithm != rfc8410::ID_ED_25519 {
            return Err(unsupported(algorithm, "Ed25519"));
        }
        let key = ed25519_dalek::VerifyingKey::try_from(key_bits)
            .map_err(|e| SantaError::Parse(format!("failed to parse Ed25519 public key: {}", e)))?;
        return Ok(Ed25519Signature::from_slice(signature)
            .map(|sig| key.verify_strict(message, &sig).is_ok())
            .unwrap_or(false));
    }

    Err(SantaError::Parse(format!("unsupported public key algorithm {}", key_oid)))
}
