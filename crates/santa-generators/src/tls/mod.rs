//! TLS and PKI generators: private keys, CSRs, and certificates.

pub mod cert_request;
pub mod locally_signed;
pub mod private_key;
pub mod self_signed;
pub mod ssh;
pub mod x509;

pub use cert_request::CertRequestGenerator;
pub use locally_signed::LocallySignedCertGenerator;
pub use private_key::PrivateKeyGenerator;
pub use self_signed::SelfSignedCertGenerator;
