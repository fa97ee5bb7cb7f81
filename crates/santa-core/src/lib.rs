//! # Santa Core
//!
//! Configuration management, logging, and common functionality shared by
//! the Secret Santa generation pipeline.
//!
//! This crate provides:
//!
//! - **Configuration**: layered settings (defaults, file, programmatic, `SANTA_*` environment)
//! - **Logging**: `tracing` subscriber setup in pretty, compact, or JSON form
//! - **Time Utilities**: timestamps for generator output, execution timing
//! - **Data Structures**: deep merging and dotted-path lookup on JSON values
//!
//! ## Example
//!
//! ```no_run
//! use santa_core::config::{Config, Settings};
//!
//! let mut config = Config::load("santa.yaml")?;
//! config.load_env();
//! let settings = Settings::from_config(&config)?;
//! santa_core::log::init(&settings.log)?;
//! # Ok::<(), santa_types::SantaError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use config::{Config, Settings};
pub use santa_types::{Result, SantaError};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "santa";

/// Prefix of environment variables read by [`Config::load_env`]
pub const ENV_PREFIX: &str = "SANTA_";
