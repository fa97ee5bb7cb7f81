//! Core traits for secret generation.

use std::collections::HashMap;
use serde_json::Value;
use crate::errors::Result;

/// Output of a single generator: field name to string value.
///
/// Every generator returns only strings (PEM text, base64, hex, decimal) so
/// templates and masking can treat all outputs uniformly.
pub type GeneratorOutput = HashMap<String, String>;

/// Outputs of every generator in a render pass, keyed by generator name.
pub type RenderContext = HashMap<String, GeneratorOutput>;

/// Trait for secret generators.
///
/// Each generator type (password, AES key, TLS certificate, ...) implements
/// this trait. Implementations hold no mutable state, so one instance can be
/// shared across threads and render passes.
pub trait Generator: Send + Sync {
    /// Registered type name (e.g. `random_password`).
    fn type_name(&self) -> &'static str;

    /// Generate fresh secret material from a loosely typed config object.
    ///
    /// The config is decoded into the generator's own typed settings;
    /// malformed or out-of-range values are returned as errors.
    fn generate(&self, config: &Value) -> Result<GeneratorOutput>;

    /// Output fields this generator always produces.
    ///
    /// Generators whose field set depends on configuration list the
    /// fields common to every configuration.
    fn output_keys(&self) -> &[&'static str];
}
