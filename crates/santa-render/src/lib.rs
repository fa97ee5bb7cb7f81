//! # Santa Render
//!
//! The end-to-end pipeline: validate generator entries, parse the template,
//! run every generator once, render, and (for dry runs) mask the result.
//!
//! ## Example
//!
//! ```
//! use santa_generators::Registry;
//! use santa_render::Renderer;
//! use santa_types::GeneratorConfig;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let renderer = Renderer::new(Arc::new(Registry::with_defaults()));
//! let configs = vec![
//!     GeneratorConfig::new("Password", "random_password").with_config(json!({"length": 16})),
//! ];
//!
//! let out = renderer.render("password: {{ .Password.value }}", &configs).unwrap();
//! assert_eq!(out.len(), "password: ".len() + 16);
//!
//! let preview = renderer.dry_run("password: {{ .Password.value }}", &configs).unwrap();
//! assert_eq!(preview.masked_output, "password: <MASKED>");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mask;
pub mod pipeline;
pub mod validation;

pub use mask::{mask, MASK};
pub use pipeline::{DryRunResult, RenderOutput, Renderer, SecretRequest};
pub use validation::validate_generator_configs;
