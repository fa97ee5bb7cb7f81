//! Common enumerations used throughout Secret Santa.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{Result, SantaError};

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = SantaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(SantaError::config("log.level", format!("invalid log level: {}", s))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = SantaError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Built-in generator types.
///
/// The registry stays open to other implementations; this enum names the
/// kinds shipped with the crate and maps them to their registered type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeneratorKind {
    /// `random_password`
    RandomPassword,
    /// `random_string`
    RandomString,
    /// `random_uuid`
    RandomUuid,
    /// `random_integer`
    RandomInteger,
    /// `random_bytes`
    RandomBytes,
    /// `random_id`
    RandomId,
    /// `crypto_aes_key`
    AesKey,
    /// `crypto_hmac`
    Hmac,
    /// `crypto_rsa_key`
    RsaKey,
    /// `crypto_ed25519_key`
    Ed25519Key,
    /// `crypto_chacha20_key`
    ChaCha20Key,
    /// `crypto_xchacha20_key`
    XChaCha20Key,
    /// `crypto_ecdsa_key`
    EcdsaKey,
    /// `crypto_ecdh_key`
    EcdhKey,
    /// `tls_private_key`
    TlsPrivateKey,
    /// `tls_cert_request`
    TlsCertRequest,
    /// `tls_self_signed_cert`
    TlsSelfSignedCert,
    /// `tls_locally_signed_cert`
    TlsLocallySignedCert,
    /// `time_static`
    TimeStatic,
}

impl GeneratorKind {
    /// Every built-in kind, in registration order.
    pub const ALL: [GeneratorKind; 19] = [
        GeneratorKind::TlsPrivateKey,
        GeneratorKind::TlsSelfSignedCert,
        GeneratorKind::TlsCertRequest,
        GeneratorKind::TlsLocallySignedCert,
        GeneratorKind::RandomPassword,
        GeneratorKind::RandomString,
        GeneratorKind::RandomUuid,
        GeneratorKind::RandomInteger,
        GeneratorKind::RandomBytes,
        GeneratorKind::RandomId,
        GeneratorKind::TimeStatic,
        GeneratorKind::Hmac,
        GeneratorKind::AesKey,
        GeneratorKind::RsaKey,
        GeneratorKind::Ed25519Key,
        GeneratorKind::ChaCha20Key,
        GeneratorKind::XChaCha20Key,
        GeneratorKind::EcdsaKey,
        GeneratorKind::EcdhKey,
    ];

    /// Registered type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            GeneratorKind::RandomPassword => "random_password",
            GeneratorKind::RandomString => "random_string",
            GeneratorKind::RandomUuid => "random_uuid",
            GeneratorKind::RandomInteger => "random_integer",
            GeneratorKind::RandomBytes => "random_bytes",
            GeneratorKind::RandomId => "random_id",
            GeneratorKind::AesKey => "crypto_aes_key",
            GeneratorKind::Hmac => "crypto_hmac",
            GeneratorKind::RsaKey => "crypto_rsa_key",
            GeneratorKind::Ed25519Key => "crypto_ed25519_key",
            GeneratorKind::ChaCha20Key => "crypto_chacha20_key",
            GeneratorKind::XChaCha20Key => "crypto_xchacha20_key",
            GeneratorKind::EcdsaKey => "crypto_ecdsa_key",
            GeneratorKind::EcdhKey => "crypto_ecdh_key",
            GeneratorKind::TlsPrivateKey => "tls_private_key",
            GeneratorKind::TlsCertRequest => "tls_cert_request",
            GeneratorKind::TlsSelfSignedCert => "tls_self_signed_cert",
            GeneratorKind::TlsLocallySignedCert => "tls_locally_signed_cert",
            GeneratorKind::TimeStatic => "time_static",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for GeneratorKind {
    type Err = SantaError;

    fn from_str(s: &str) -> Result<Self> {
        GeneratorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_name() == s)
            .ok_or_else(|| SantaError::UnsupportedType(s.to_string()))
    }
}

/// Asymmetric key algorithm families used by the TLS generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAlgorithm {
    /// RSA
    Rsa,
    /// ECDSA over a NIST curve
    Ecdsa,
    /// Ed25519
    Ed25519,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa => write!(f, "RSA"),
            KeyAlgorithm::Ecdsa => write!(f, "ECDSA"),
            KeyAlgorithm::Ed25519 => write!(f, "ED25519"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = SantaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "RSA" => Ok(KeyAlgorithm::Rsa),
            "ECDSA" => Ok(KeyAlgorithm::Ecdsa),
            "ED25519" => Ok(KeyAlgorithm::Ed25519),
            _ => Err(SantaError::config(
                "algorithm",
                format!("unsupported key algorithm: {} (expected RSA, ECDSA or ED25519)", s),
            )),
        }
    }
}
