//! OpenSSH public key rendering and fingerprints for RSA keys.

use md5::{Digest as _, Md5};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::encoding;

/// OpenSSH wire-format public key blob (`string "ssh-rsa", mpint e, mpint n`).
pub fn rsa_public_blob(key: &RsaPrivateKey) -> Vec<u8> {
    let mut buf = Vec::new();
    write_ssh_string(&mut buf, b"ssh-rsa");
    write_ssh_mpint(&mut buf, &key.e().to_bytes_be());
    write_ssh_mpint(&mut buf, &key.n().to_bytes_be());
    buf
}

/// `authorized_keys` line: `ssh-rsa <base64 blob>\n`.
pub fn authorized_key(blob: &[u8]) -> String {
    format!("ssh-rsa {}\n", encoding::b64(blob))
}

/// Legacy MD5 fingerprint: colon-separated lower-case hex.
pub fn md5_fingerprint(blob: &[u8]) -> String {
    encoding::colon_hex(&Md5::digest(blob))
}

/// `SHA256:` followed by unpadded standard base64 of the digest.
pub fn sha256_fingerprint(blob: &[u8]) -> String {
    format!("SHA256:{}", encoding::b64_unpadded(Sha256::digest(blob)))
}

fn write_ssh_string(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

fn write_ssh_mpint(buf: &mut Vec<u8>, data: &[u8]) {
    let mut trimmed = data;
    while trimmed.len() > 1 && trimmed[0] == 0 {
        trimmed = &trimmed[1..];
    }
    if trimmed == [0] {
        trimmed = &[];
    }

    // A set high bit would read as negative; pad with a zero byte.
    if trimmed.first().is_some_and(|b| b & 0x80 != 0) {
        buf.extend_from_slice(&((trimmed.len() + 1) as u32).to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(trimmed);
    } else {
        write_ssh_string(buf, trimmed);
    }
}
