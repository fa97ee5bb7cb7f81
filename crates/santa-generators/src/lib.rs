//! # Santa Generators
//!
//! The generator registry and every built-in secret generator.
//!
//! Provides implementations for all generator types:
//! - Random values: passwords, strings, UUIDs, integers, bytes, prefixed IDs
//! - Symmetric keys: AES, HMAC (key plus signature), ChaCha20, XChaCha20
//! - Asymmetric keys: RSA, Ed25519, ECDSA, ECDH
//! - TLS: private keys with SSH fingerprints, CSRs, self-signed and CA-signed certificates
//! - Static or current timestamps
//!
//! Every generator returns a flat `field -> string` map.
//!
//! ## Example
//!
//! ```
//! use santa_generators::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::with_defaults();
//! let generator = registry.get("crypto_aes_key").unwrap();
//! let output = generator.generate(&json!({"key_size": 128})).unwrap();
//! assert_eq!(output["key_size"], "128");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod random;
pub mod registry;
pub mod rng;
pub mod timestamp;
pub mod tls;

pub use registry::{builtin, Registry};
pub use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
