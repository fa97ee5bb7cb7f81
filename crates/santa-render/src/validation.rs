//! Checks on generator entries that run before anything is generated.

use santa_generators::Registry;
use santa_types::{GeneratorConfig, Result, SantaError};
use std::collections::HashSet;

/// Validate a list of generator entries against `registry`.
///
/// Rejects empty names and types, unregistered types (naming both the type
/// and the entry), and duplicate names. Stops at the first problem.
pub fn validate_generator_configs(configs: &[GeneratorConfig], registry: &Registry) -> Result<()> {
    let mut seen = HashSet::with_capacity(configs.len());

    for (index, entry) in configs.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(SantaError::config(
                format!("generators[{}].name", index),
                "generator name cannot be empty",
            ));
        }
        if entry.kind.trim().is_empty() {
            return Err(SantaError::config(
                format!("generators[{}].type", index),
                format!("generator type cannot be empty for generator '{}'", entry.name),
            ));
        }
        if !registry.is_supported(&entry.kind) {
            return Err(SantaError::UnsupportedType(entry.kind.clone())
                .in_generator(&entry.name, &entry.kind));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(SantaError::DuplicateName(entry.name.clone()));
        }
    }

    tracing::debug!(count = configs.len(), "generator entries validated");
    Ok(())
}
