//! `tls_cert_request`: a PKCS#10 request signed by a supplied private key.

use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use x509_cert::builder::{Builder, RequestBuilder};

use super::x509::{self, build_err, AltNames, Subject};
use crate::config::{lenient, parse_config, required};
use crate::crypto::signing::RawSignature;
use crate::crypto::PrivateKey;
use crate::encoding::CSR_LABEL;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CertRequestConfig {
    #[serde(deserialize_with = "lenient::optional_string")]
    private_key_pem: Option<String>,
}

/// `tls_cert_request` generator.
///
/// The key may be PKCS#8, PKCS#1 RSA or SEC1 EC on any supported curve; its
/// algorithm is reported as `key_algorithm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertRequestGenerator;

impl Generator for CertRequestGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::TlsCertRequest.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let settings: CertRequestConfig = parse_config(config)?;
        let subject: Subject = parse_config(config)?;
        let alt_names: AltNames = parse_config(config)?;

        let pem = required("private_key_pem", settings.private_key_pem)?;
        let key = PrivateKey::from_pem(&pem, "private_key_pem")?;
        let signer = key.signer()?;

        let mut builder =
            RequestBuilder::new(subject.to_name()?, &signer).map_err(build_err("start certificate request"))?;
        if let Some(san) = alt_names.to_extension()? {
            builder
                .add_extension(&san)
                .map_err(build_err("add subject alternative names"))?;
        }
        let csr = builder
            .build::<RawSignature>()
            .map_err(build_err("create certificate request"))?;

        tracing::debug!(
            key_algorithm = %key.algorithm(),
            common_name = ?subject.common_name,
            "created certificate request"
        );

        let mut result = HashMap::new();
        result.insert("cert_request_pem".to_string(), x509::to_pem(&csr, CSR_LABEL)?);
        result.insert("key_algorithm".to_string(), key.algorithm().to_string());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["cert_request_pem", "key_algorithm"]
    }
}
