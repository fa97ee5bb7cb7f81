//! Symmetric and asymmetric key generators.

pub mod ecdh_key;
pub mod ecdsa_key;
pub mod ed25519_key;
pub mod keys;
pub mod mac;
pub mod rsa_key;
pub mod signing;
pub mod symmetric;

pub use ecdh_key::{EcdhCurve, EcdhKeyGenerator};
pub use ecdsa_key::EcdsaKeyGenerator;
pub use ed25519_key::Ed25519KeyGenerator;
pub use keys::{EcCurve, KeySpec, PrivateKey};
pub use mac::HmacGenerator;
pub use rsa_key::RsaKeyGenerator;
pub use signing::{verify_signature, KeySigner};
pub use symmetric::{AesKeyGenerator, StreamCipher, StreamCipherKeyGenerator};

use santa_types::{GeneratorOutput, Result};

use crate::encoding;

/// Fill the PEM pair fields shared by the RSA, Ed25519 and ECDSA generators.
///
/// The `*_base64` fields carry the standard base64 of the full PEM text.
pub(crate) fn insert_pem_pair(result: &mut GeneratorOutput, key: &PrivateKey) -> Result<()> {
    let private_pem = key.to_pkcs8_pem()?;
    let public_pem = key.public_key_pem()?;
    result.insert("private_key_base64".to_string(), encoding::b64(private_pem.as_bytes()));
    result.insert("public_key_base64".to_string(), encoding::b64(public_pem.as_bytes()));
    result.insert("private_key_pem".to_string(), private_pem);
    result.insert("public_key_pem".to_string(), public_pem);
    Ok(())
}
