//! `tls_locally_signed_cert`: issue a certificate for a CSR from a local CA.
//!
//! Every chain check runs before anything is signed: the request's own
//! signature, then the CA key against the CA certificate's public key. The
//! issued certificate takes its subject, public key and subject alternative
//! names from the request and its issuer from the CA certificate.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::oid::db::{rfc5280, rfc5912};
use x509_cert::der::Decode;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::request::CertReq;
use x509_cert::spki::ObjectIdentifier;
use x509_cert::Certificate;
use x509_parser::prelude::{FromDer, X509CertificationRequest};

use super::x509::{self, build_err, Validity};
use crate::config::{lenient, parse_config, required};
use crate::crypto::signing::RawSignature;
use crate::crypto::{verify_signature, PrivateKey};
use crate::encoding::{CERTIFICATE_LABEL, CSR_LABEL};

const DEFAULT_VALIDITY_HOURS: i64 = 24 * 365;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LocallySignedConfig {
    #[serde(deserialize_with = "lenient::optional_string")]
    cert_request_pem: Option<String>,
    #[serde(deserialize_with = "lenient::optional_string")]
    ca_private_key_pem: Option<String>,
    #[serde(deserialize_with = "lenient::optional_string")]
    ca_cert_pem: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    validity_period_hours: i64,
    #[serde(deserialize_with = "lenient::boolean")]
    is_ca_certificate: bool,
}

impl Default for LocallySignedConfig {
    fn default() -> Self {
        Self {
            cert_request_pem: None,
            ca_private_key_pem: None,
            ca_cert_pem: None,
            validity_period_hours: DEFAULT_VALIDITY_HOURS,
            is_ca_certificate: false,
        }
    }
}

fn parse_err(field: &'static str) -> impl Fn(x509_cert::der::Error) -> SantaError {
    move |e| SantaError::Parse(format!("failed to parse {}: {}", field, e))
}

/// Check the request's self-signature.
///
/// A signature algorithm outside the supported set is a parse error; only a
/// signature that does not verify is a chain failure.
fn verify_request(der: &[u8]) -> Result<()> {
    let (rest, csr) = X509CertificationRequest::from_der(der)
        .map_err(|e| SantaError::Parse(format!("failed to parse cert_request_pem: {}", e)))?;
    if !rest.is_empty() {
        return Err(SantaError::Parse("cert_request_pem contains extra data".to_string()));
    }
    let info = &csr.certification_request_info;
    let algorithm = ObjectIdentifier::from_bytes(csr.signature_algorithm.algorithm.as_bytes())
        .map_err(|e| SantaError::Parse(format!("cert_request_pem signature algorithm: {}", e)))?;
    if !verify_signature(info.subject_pki.raw, &algorithm, info.raw, &csr.signature_value.data)? {
        return Err(SantaError::ChainValidation(
            "certificate request signature is invalid".to_string(),
        ));
    }
    Ok(())
}

fn verify_ca_pair(ca_key: &PrivateKey, ca_der: &[u8]) -> Result<()> {
    let ca_cert = x509::parse_certificate(ca_der, "ca_cert_pem")?;
    if !x509::key_matches(ca_key, ca_cert.public_key())? {
        return Err(SantaError::ChainValidation(format!(
            "CA private key ({}) does not match the CA certificate public key",
            ca_key.algorithm()
        )));
    }
    Ok(())
}

/// The subjectAltName extension carried in the request's extensionRequest.
fn requested_alt_names(request: &CertReq) -> Result<Option<SubjectAltName>> {
    let requested = request
        .info
        .attributes
        .iter()
        .filter(|attr| attr.oid == rfc5912::ID_EXTENSION_REQ)
        .flat_map(|attr| attr.values.iter());
    for value in requested {
        let extensions: Vec<Extension> = value.decode_as().map_err(parse_err("cert_request_pem"))?;
        if let Some(ext) = extensions
            .iter()
            .find(|ext| ext.extn_id == rfc5280::ID_CE_SUBJECT_ALT_NAME)
        {
            let san = SubjectAltName::from_der(ext.extn_value.as_bytes())
                .map_err(parse_err("cert_request_pem"))?;
            return Ok(Some(san));
        }
    }
    Ok(None)
}

/// `tls_locally_signed_cert` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocallySignedCertGenerator;

impl Generator for LocallySignedCertGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::TlsLocallySignedCert.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: LocallySignedConfig = parse_config(config)?;
        let request_pem = required("cert_request_pem", settings.cert_request_pem)?;
        let ca_key_pem = required("ca_private_key_pem", settings.ca_private_key_pem)?;
        let ca_cert_pem = required("ca_cert_pem", settings.ca_cert_pem)?;
        let validity_hours = x509::check_hours("validity_period_hours", settings.validity_period_hours)?;

        let request_der = x509::decode_labelled(&request_pem, "cert_request_pem", CSR_LABEL)?;
        verify_request(&request_der)?;
        let request = CertReq::from_der(&request_der).map_err(parse_err("cert_request_pem"))?;

        let ca_key = PrivateKey::from_pem(&ca_key_pem, "ca_private_key_pem")?;
        let ca_der = x509::decode_labelled(&ca_cert_pem, "ca_cert_pem", CERTIFICATE_LABEL)?;
        verify_ca_pair(&ca_key, &ca_der)?;
        let issuer = Certificate::from_der(&ca_der)
            .map_err(parse_err("ca_cert_pem"))?
            .tbs_certificate
            .subject;

        let signer = ca_key.signer()?;
        let (serial, serial_hex) = x509::random_serial()?;
        let validity = Validity::starting_now(validity_hours);
        let san = requested_alt_names(&request)?;

        let mut builder = CertificateBuilder::new(
            Profile::Manual { issuer: Some(issuer) },
            serial,
            validity.to_x509()?,
            request.info.subject,
            request.info.public_key,
            &signer,
        )
        .map_err(build_err("start certificate"))?;
        if let Some(san) = san {
            builder
                .add_extension(&san)
                .map_err(build_err("add subject alternative names"))?;
        }
        x509::add_usage(&mut builder, settings.is_ca_certificate)?;
        let cert = builder
            .build::<RawSignature>()
            .map_err(build_err("sign certificate"))?;

        tracing::info!(
            serial = %serial_hex,
            ca_key_algorithm = %ca_key.algorithm(),
            validity_hours,
            "issued certificate from local CA"
        );

        let mut result = HashMap::new();
        result.insert("cert_pem".to_string(), x509::to_pem(&cert, CERTIFICATE_LABEL)?);
        result.insert("ca_key_algorithm".to_string(), ca_key.algorithm().to_string());
        result.insert("serial_number".to_string(), serial_hex);
        validity.insert_into(&mut result);
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &[
            "cert_pem",
            "ca_key_algorithm",
            "serial_number",
            "validity_start_time",
            "validity_end_time",
            "ready_for_renewal",
        ]
    }
}
