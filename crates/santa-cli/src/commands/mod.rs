//! CLI command implementations.

pub mod render;
pub mod types;
pub mod validate;

use anyhow::{Context, Result};
use santa_render::SecretRequest;
use std::path::Path;

/// Read and parse a request file.
pub fn load_request(path: &Path) -> Result<SecretRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    SecretRequest::from_yaml(&text)
        .with_context(|| format!("failed to parse request file {}", path.display()))
}
