//! # Santa Types
//!
//! Core types, traits, and errors shared across all Secret Santa crates.
//!
//! This crate provides the building blocks of the secret generation pipeline:
//!
//! - The [`Generator`] trait every secret generator implements
//! - Generator configuration entries and the output/context maps they produce
//! - Closed enumerations for generator kinds, key algorithms, and log levels
//! - The [`SantaError`] taxonomy and its [`Result`] alias
//!
//! ## Example
//!
//! ```
//! use santa_types::{GeneratorConfig, GeneratorKind};
//!
//! let entry: GeneratorConfig = serde_json::from_str(
//!     r#"{"name": "Password", "type": "random_password", "config": {"length": 24}}"#,
//! ).unwrap();
//! assert_eq!(entry.name, "Password");
//! assert_eq!(entry.kind.parse::<GeneratorKind>().unwrap(), GeneratorKind::RandomPassword);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod enums;
pub mod errors;
pub mod traits;

// Re-export common types for convenience
pub use config::{GeneratorConfig, LogConfig, LogFormat};
pub use enums::{GeneratorKind, KeyAlgorithm, LogLevel};
pub use errors::{Result, SantaError, SecurityViolation};
pub use traits::{Generator, GeneratorOutput, RenderContext};
