//! Certificate building blocks shared by the TLS generators.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use santa_types::{GeneratorOutput, Result, SantaError};
use serde::{Deserialize, Deserializer};
use std::net::IpAddr;
use std::time::SystemTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::builder::{self, CertificateBuilder};
use x509_cert::der::asn1::{Any, Ia5String, PrintableStringRef, Utf8StringRef};
use x509_cert::der::oid::db::{rfc4519, rfc5280};
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName};
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::config::lenient;
use crate::crypto::{KeySigner, PrivateKey};
use crate::{encoding, rng};

/// Upper bound on any validity window, in hours (1000 years).
pub const MAX_VALIDITY_HOURS: i64 = 24 * 365 * 1000;

/// Map a certificate builder error into a generation failure.
pub(crate) fn build_err(action: &'static str) -> impl Fn(builder::Error) -> SantaError {
    move |e| SantaError::Generation(format!("failed to {}: {}", action, e))
}

fn der_err(action: &'static str) -> impl Fn(x509_cert::der::Error) -> SantaError {
    move |e| SantaError::Generation(format!("failed to {}: {}", action, e))
}

fn trimmed<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient::string(deserializer)?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Subject distinguished name fields; blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Subject {
    /// CN
    #[serde(deserialize_with = "trimmed")]
    pub common_name: Option<String>,
    /// O
    #[serde(deserialize_with = "trimmed")]
    pub organization: Option<String>,
    /// OU
    #[serde(deserialize_with = "trimmed")]
    pub organizational_unit: Option<String>,
    /// C
    #[serde(deserialize_with = "trimmed")]
    pub country: Option<String>,
    /// ST
    #[serde(deserialize_with = "trimmed")]
    pub province: Option<String>,
    /// L
    #[serde(deserialize_with = "trimmed")]
    pub locality: Option<String>,
}

impl Subject {
    /// Build the distinguished name in conventional RDN order.
    ///
    /// The country is a PrintableString, every other attribute UTF8String.
    pub fn to_name(&self) -> Result<Name> {
        let entries = [
            (rfc4519::C, "country", &self.country),
            (rfc4519::ST, "province", &self.province),
            (rfc4519::L, "locality", &self.locality),
            (rfc4519::O, "organization", &self.organization),
            (rfc4519::OU, "organizational_unit", &self.organizational_unit),
            (rfc4519::CN, "common_name", &self.common_name),
        ];
        let mut rdns = Vec::new();
        for (oid, field, value) in entries {
            let Some(value) = value else {
                continue;
            };
            let encoded = if oid == rfc4519::C {
                PrintableStringRef::new(value).and_then(|s| Any::encode_from(&s))
            } else {
                Utf8StringRef::new(value).and_then(|s| Any::encode_from(&s))
            }
            .map_err(|e| SantaError::config(field, format!("cannot encode \"{}\": {}", value, e)))?;
            let rdn = RelativeDistinguishedName::try_from(vec![AttributeTypeAndValue {
                oid,
                value: encoded,
            }])
            .map_err(der_err("build subject name"))?;
            rdns.push(rdn);
        }
        Ok(RdnSequence(rdns))
    }
}

/// Subject alternative names as configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AltNames {
    /// DNS names
    #[serde(deserialize_with = "lenient::string_list")]
    pub dns_names: Vec<String>,
    /// IP addresses, unparsed
    #[serde(deserialize_with = "lenient::string_list")]
    pub ip_addresses: Vec<String>,
}

impl AltNames {
    /// Parse `ip_addresses`, naming the bad entry on failure.
    pub fn ips(&self) -> Result<Vec<IpAddr>> {
        self.ip_addresses
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                raw.trim().parse().map_err(|_| {
                    SantaError::config(
                        format!("ip_addresses[{}]", i),
                        format!("invalid IP address: {}", raw),
                    )
                })
            })
            .collect()
    }

    /// The subjectAltName extension, or `None` when no names are set.
    pub fn to_extension(&self) -> Result<Option<SubjectAltName>> {
        let mut names = Vec::new();
        for (i, dns) in self.dns_names.iter().enumerate() {
            let name = Ia5String::new(dns).map_err(|_| {
                SantaError::config(format!("dns_names[{}]", i), format!("invalid DNS name: {}", dns))
            })?;
            names.push(GeneralName::DnsName(name));
        }
        names.extend(self.ips()?.into_iter().map(GeneralName::from));
        Ok((!names.is_empty()).then(|| SubjectAltName(names)))
    }
}

/// 128 random bits with the top bit cleared, so the serial is a positive
/// DER integer. Returns the serial and its lower-case hex form.
pub fn random_serial() -> Result<(SerialNumber, String)> {
    let mut bytes = rng::array::<16>()?;
    bytes[0] &= 0x7f;
    if bytes.iter().all(|b| *b == 0) {
        bytes[15] = 1;
    }
    let significant = bytes.iter().position(|b| *b != 0).unwrap_or(15);
    let hex = encoding::hex(&bytes[significant..]);
    let serial = SerialNumber::new(&bytes[significant..]).map_err(der_err("encode serial number"))?;
    Ok((serial, hex))
}

/// Validity window of an issued certificate, at second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    /// Start of the window
    pub not_before: DateTime<Utc>,
    /// End of the window
    pub not_after: DateTime<Utc>,
}

impl Validity {
    /// Window from now lasting `hours`.
    pub fn starting_now(hours: i64) -> Self {
        let not_before = Utc::now().trunc_subsecs(0);
        Self {
            not_before,
            not_after: not_before + Duration::hours(hours),
        }
    }

    /// The window in certificate form.
    pub fn to_x509(&self) -> Result<x509_cert::time::Validity> {
        let time = |at: DateTime<Utc>| {
            Time::try_from(SystemTime::from(at)).map_err(der_err("encode certificate validity"))
        };
        Ok(x509_cert::time::Validity {
            not_before: time(self.not_before)?,
            not_after: time(self.not_after)?,
        })
    }

    /// Add `validity_start_time`, `validity_end_time` and `ready_for_renewal`.
    pub fn insert_into(&self, result: &mut GeneratorOutput) {
        result.insert(
            "validity_start_time".to_string(),
            santa_core::time::rfc3339(self.not_before),
        );
        result.insert(
            "validity_end_time".to_string(),
            santa_core::time::rfc3339(self.not_after),
        );
        // No renewal policy exists; callers decide when to re-issue.
        result.insert("ready_for_renewal".to_string(), "false".to_string());
    }
}

/// Check a validity length in hours: positive and at most [`MAX_VALIDITY_HOURS`].
pub fn check_hours(field: &str, hours: i64) -> Result<i64> {
    if hours <= 0 {
        return Err(SantaError::config(
            field,
            format!("{} must be greater than 0, got {}", field, hours),
        ));
    }
    if hours > MAX_VALIDITY_HOURS {
        return Err(SantaError::config(
            field,
            format!("{} must be at most {} hours", field, MAX_VALIDITY_HOURS),
        ));
    }
    Ok(hours)
}

/// Add key usage, extended key usage and basic constraints.
///
/// Every certificate is a TLS server certificate; a CA additionally gets
/// certificate and CRL signing.
pub fn add_usage(builder: &mut CertificateBuilder<'_, KeySigner<'_>>, is_ca: bool) -> Result<()> {
    let mut usage = KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment;
    if is_ca {
        usage |= KeyUsages::KeyCertSign | KeyUsages::CRLSign;
    }
    builder
        .add_extension(&KeyUsage(usage))
        .map_err(build_err("add key usage"))?;
    builder
        .add_extension(&ExtendedKeyUsage(vec![rfc5280::ID_KP_SERVER_AUTH]))
        .map_err(build_err("add extended key usage"))?;
    builder
        .add_extension(&BasicConstraints {
            ca: is_ca,
            path_len_constraint: None,
        })
        .map_err(build_err("add basic constraints"))?;
    Ok(())
}

/// The SubjectPublicKeyInfo of `key`, ready for a certificate body.
pub fn subject_public_key(key: &PrivateKey) -> Result<SubjectPublicKeyInfoOwned> {
    SubjectPublicKeyInfoOwned::from_der(&key.public_key_der()?).map_err(der_err("encode public key"))
}

/// DER-encode `value` as a PEM block labelled `label`.
pub fn to_pem<T: Encode>(value: &T, label: &str) -> Result<String> {
    let der = value.to_der().map_err(der_err("encode DER"))?;
    Ok(encoding::pem_encode(label, &der))
}

/// Decode a single PEM block of the expected `label` into DER.
pub fn decode_labelled(input: &str, field: &str, label: &str) -> Result<Vec<u8>> {
    let block = encoding::pem_decode_single(input, field)?;
    if block.tag() != label {
        return Err(SantaError::Parse(format!(
            "{} must be a {} PEM block, got {}",
            field,
            label,
            block.tag()
        )));
    }
    Ok(block.into_contents())
}

/// Parse DER as a certificate with no trailing bytes.
pub fn parse_certificate<'a>(der: &'a [u8], field: &str) -> Result<X509Certificate<'a>> {
    let (rest, cert) = X509Certificate::from_der(der)
        .map_err(|e| SantaError::Parse(format!("failed to parse {}: {}", field, e)))?;
    if !rest.is_empty() {
        return Err(SantaError::Parse(format!("{} contains extra data", field)));
    }
    Ok(cert)
}

/// Whether `key` is the private half of `spki`.
///
/// RSA compares modulus and exponent, EC compares curve and point, Ed25519
/// (and anything else) compares the raw key bits.
pub fn key_matches(key: &PrivateKey, spki: &SubjectPublicKeyInfo<'_>) -> Result<bool> {
    let der = key.public_key_der()?;
    let (_, ours) = SubjectPublicKeyInfo::from_der(&der)
        .map_err(|e| SantaError::Generation(format!("failed to re-parse public key: {}", e)))?;

    if ours.algorithm.algorithm != spki.algorithm.algorithm {
        return Ok(false);
    }
    Ok(match (ours.parsed(), spki.parsed()) {
        (Ok(PublicKey::RSA(a)), Ok(PublicKey::RSA(b))) => {
            strip_zeros(a.modulus) == strip_zeros(b.modulus)
                && strip_zeros(a.exponent) == strip_zeros(b.exponent)
        }
        (Ok(PublicKey::EC(a)), Ok(PublicKey::EC(b))) => {
            let curve = |info: &SubjectPublicKeyInfo<'_>| {
                info.algorithm.parameters.as_ref().map(|p| p.data.to_vec())
            };
            curve(&ours) == curve(spki) && a.data() == b.data()
        }
        _ => ours.subject_public_key.data == spki.subject_public_key.data,
    })
}

/// Whether `cert` carries a valid signature by the holder of `issuer`.
#[cfg(test)]
pub(crate) fn signed_by(cert: &X509Certificate<'_>, issuer: &SubjectPublicKeyInfo<'_>) -> Result<bool> {
    let algorithm = x509_cert::spki::ObjectIdentifier::from_bytes(cert.signature_algorithm.algorithm.as_bytes())
        .map_err(|e| SantaError::Parse(format!("bad signature algorithm: {}", e)))?;
    crate::crypto::verify_signature(
        issuer.raw,
        &algorithm,
        cert.tbs_certificate.as_ref(),
        &cert.signature_value.data,
    )
}

fn strip_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
