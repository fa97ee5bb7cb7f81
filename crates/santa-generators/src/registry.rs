//! Generator registry.
//!
//! Maps registered type names to shared generator instances. The registry is
//! an explicit value: build one at startup (usually [`Registry::with_defaults`])
//! and share it behind an `Arc`. Lookups take a read lock, registration an
//! exclusive one.

use parking_lot::RwLock;
use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::crypto::{
    AesKeyGenerator, EcdhKeyGenerator, EcdsaKeyGenerator, Ed25519KeyGenerator, HmacGenerator,
    RsaKeyGenerator, StreamCipher, StreamCipherKeyGenerator,
};
use crate::random::{
    BytesGenerator, IdGenerator, IntegerGenerator, PasswordGenerator, StringGenerator,
    UuidGenerator,
};
use crate::timestamp::StaticTimeGenerator;
use crate::tls::{
    CertRequestGenerator, LocallySignedCertGenerator, PrivateKeyGenerator,
    SelfSignedCertGenerator,
};

/// Factory for the built-in generator of `kind`.
pub fn builtin(kind: GeneratorKind) -> Arc<dyn Generator> {
    match kind {
        GeneratorKind::RandomPassword => Arc::new(PasswordGenerator),
        GeneratorKind::RandomString => Arc::new(StringGenerator),
        GeneratorKind::RandomUuid => Arc::new(UuidGenerator),
        GeneratorKind::RandomInteger => Arc::new(IntegerGenerator),
        GeneratorKind::RandomBytes => Arc::new(BytesGenerator),
        GeneratorKind::RandomId => Arc::new(IdGenerator),
        GeneratorKind::AesKey => Arc::new(AesKeyGenerator),
        GeneratorKind::Hmac => Arc::new(HmacGenerator),
        GeneratorKind::RsaKey => Arc::new(RsaKeyGenerator),
        GeneratorKind::Ed25519Key => Arc::new(Ed25519KeyGenerator),
        GeneratorKind::ChaCha20Key => Arc::new(StreamCipherKeyGenerator::new(StreamCipher::ChaCha20)),
        GeneratorKind::XChaCha20Key => Arc::new(StreamCipherKeyGenerator::new(StreamCipher::XChaCha20)),
        GeneratorKind::EcdsaKey => Arc::new(EcdsaKeyGenerator),
        GeneratorKind::EcdhKey => Arc::new(EcdhKeyGenerator),
        GeneratorKind::TlsPrivateKey => Arc::new(PrivateKeyGenerator),
        GeneratorKind::TlsCertRequest => Arc::new(CertRequestGenerator),
        GeneratorKind::TlsSelfSignedCert => Arc::new(SelfSignedCertGenerator),
        GeneratorKind::TlsLocallySignedCert => Arc::new(LocallySignedCertGenerator),
        GeneratorKind::TimeStatic => Arc::new(StaticTimeGenerator),
    }
}

/// Thread-safe lookup table from type name to generator.
#[derive(Default)]
pub struct Registry {
    generators: RwLock<HashMap<String, Arc<dyn Generator>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.list_types())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in generator.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        {
            let mut generators = registry.generators.write();
            for kind in GeneratorKind::ALL {
                generators.insert(kind.type_name().to_string(), builtin(kind));
            }
        }
        tracing::debug!(count = GeneratorKind::ALL.len(), "registered built-in generators");
        registry
    }

    /// Register `generator` under `type_name`.
    ///
    /// Fails if the name is empty or already taken.
    pub fn register(&self, type_name: &str, generator: Arc<dyn Generator>) -> Result<()> {
        if type_name.trim().is_empty() {
            return Err(SantaError::config("type", "generator type cannot be empty"));
        }

        let mut generators = self.generators.write();
        if generators.contains_key(type_name) {
            return Err(SantaError::DuplicateType(type_name.to_string()));
        }
        generators.insert(type_name.to_string(), generator);
        tracing::debug!(generator_type = type_name, "registered generator");
        Ok(())
    }

    /// Look up the generator for `type_name`.
    pub fn get(&self, type_name: &str) -> Result<Arc<dyn Generator>> {
        self.generators
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| SantaError::UnsupportedType(type_name.to_string()))
    }

    /// Look up and run a generator in one step.
    pub fn generate(&self, type_name: &str, config: &Value) -> Result<GeneratorOutput> {
        self.get(type_name)?.generate(config)
    }

    /// All registered type names, sorted.
    pub fn list_types(&self) -> BTreeSet<String> {
        self.generators.read().keys().cloned().collect()
    }

    /// Whether `type_name` is registered.
    pub fn is_supported(&self, type_name: &str) -> bool {
        self.generators.read().contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.generators.read().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.generators.read().is_empty()
    }

    /// Remove every registration. Intended for tests.
    pub fn clear(&self) {
        self.generators.write().clear();
    }
}
