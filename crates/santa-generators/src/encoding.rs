//! Text encodings shared by the generators.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};
use base64::Engine;
use santa_types::{Result, SantaError};

/// PEM label of PKCS#8 private keys.
pub const PKCS8_LABEL: &str = "PRIVATE KEY";
/// PEM label of PKCS#1 RSA private keys.
pub const PKCS1_LABEL: &str = "RSA PRIVATE KEY";
/// PEM label of PKIX public keys.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
/// PEM label of X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of PKCS#10 certificate requests.
pub const CSR_LABEL: &str = "CERTIFICATE REQUEST";

/// Standard base64 with padding.
pub fn b64(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Standard base64 without padding (SSH fingerprints).
pub fn b64_unpadded(data: impl AsRef<[u8]>) -> String {
    STANDARD_NO_PAD.encode(data)
}

/// URL-safe base64 with padding.
pub fn b64_url(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

/// Decode standard base64.
pub fn b64_decode(data: &str) -> Option<Vec<u8>> {
    STANDARD.decode(data.trim()).ok()
}

/// Lower-case hex.
pub fn hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(data)
}

/// Lower-case hex bytes separated by colons (`de:ad:be:ef`).
pub fn colon_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// PEM-encode `der` under `label`, 64 columns, LF line endings.
pub fn pem_encode(label: &str, der: &[u8]) -> String {
    let block = pem::Pem::new(label, der.to_vec());
    pem::encode_config(
        &block,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Decode the single PEM block in `input`.
///
/// Anything other than whitespace after the block is rejected, as is input
/// without a block. `field` names the config field in error messages.
pub fn pem_decode_single(input: &str, field: &str) -> Result<pem::Pem> {
    let block = pem::parse(input)
        .map_err(|e| SantaError::Parse(format!("failed to decode {} PEM: {}", field, e)))?;

    let end_marker = format!("-----END {}-----", block.tag());
    let rest = input
        .find(&end_marker)
        .map(|pos| &input[pos + end_marker.len()..])
        .unwrap_or("");
    if !rest.trim().is_empty() {
        return Err(SantaError::Parse(format!("{} PEM contains extra data", field)));
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodings() {
        assert_eq!(b64(b"hi?>"), "aGk/Pg==");
        assert_eq!(b64_url(b"hi?>"), "aGk_Pg==");
        assert_eq!(b64_unpadded(b"hi?>"), "aGk/Pg");
        assert_eq!(b64_decode("aGk/Pg==").unwrap(), b"hi?>");
        assert_eq!(hex([0xde, 0xad]), "dead");
        assert_eq!(colon_hex(&[0x0a, 0xff, 0x00]), "0a:ff:00");
    }

    #[test]
    fn test_pem_roundtrip_and_trailing_data() {
        let text = pem_encode(CSR_LABEL, &[1, 2, 3, 4]);
        assert!(text.starts_with("-----BEGIN CERTIFICATE REQUEST-----\n"));
        assert!(text.ends_with("-----END CERTIFICATE REQUEST-----\n"));

        let block = pem_decode_single(&text, "cert_request_pem").unwrap();
        assert_eq!(block.tag(), CSR_LABEL);
        assert_eq!(block.contents(), &[1, 2, 3, 4]);

        let doubled = format!("{}{}", text, text);
        let err = pem_decode_single(&doubled, "cert_request_pem").unwrap_err();
        assert_eq!(err.to_string(), "parse error: cert_request_pem PEM contains extra data");

        assert!(pem_decode_single("not pem at all", "ca_cert_pem").is_err());
    }
}
