//! Configuration management for Secret Santa.
//!
//! ## Configuration Layers
//!
//! Configuration values are resolved in this priority order:
//! 1. Environment variables (`SANTA_*`)
//! 2. Programmatically set values
//! 3. Values loaded from file
//! 4. Default values
//!
//! ## Example
//!
//! ```
//! use santa_core::config::{Config, Settings};
//!
//! let mut config = Config::new();
//! config.set("dry_run", true).unwrap();
//!
//! let settings = Settings::from_config(&config).unwrap();
//! assert!(settings.dry_run);
//! ```

use santa_types::{LogConfig, Result, SantaError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use crate::util::data::{deep_merge, get_path, set_path};

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
    /// Values from environment variables
    Environment = 3,
}

const LAYER_ORDER: [ConfigLayer; 4] = [
    ConfigLayer::Default,
    ConfigLayer::Loaded,
    ConfigLayer::Set,
    ConfigLayer::Environment,
];

/// Environment variables understood by [`Config::load_env`] and the
/// dotted configuration key each one sets.
pub const ENV_KEYS: [(&str, &str); 4] = [
    ("SANTA_DRY_RUN", "dry_run"),
    ("SANTA_LOG_LEVEL", "log.level"),
    ("SANTA_LOG_FORMAT", "log.format"),
    ("SANTA_MAX_TEMPLATE_SIZE", "max_template_size"),
];

/// Layered configuration store.
///
/// This is the low-level configuration type; [`Settings`] is the typed view
/// the rest of the pipeline consumes.
#[derive(Clone, Debug)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a configuration holding only the default layer.
    pub fn new() -> Self {
        let mut layers = HashMap::new();
        if let Ok(defaults) = serde_json::to_value(Settings::default()) {
            layers.insert(ConfigLayer::Default, defaults);
        }
        Self {
            layers,
            file_path: None,
        }
    }

    /// Create a configuration from a YAML or JSON file.
    ///
    /// If the file doesn't exist, only the defaults are present.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::new();

        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                SantaError::config("config_file", format!("failed to read {}: {}", path.display(), e))
            })?;
            let value: Value = serde_yaml::from_str(&content).map_err(|e| {
                SantaError::config("config_file", format!("failed to parse {}: {}", path.display(), e))
            })?;
            if !value.is_null() {
                config.layers.insert(ConfigLayer::Loaded, value);
            }
            tracing::debug!(path = %path.display(), "loaded configuration file");
        }

        config.file_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Populate the environment layer from the process environment.
    pub fn load_env(&mut self) {
        self.load_env_from(std::env::vars());
    }

    /// Populate the environment layer from explicit `(name, value)` pairs.
    ///
    /// Only the variables listed in [`ENV_KEYS`] are considered. Values that
    /// parse as JSON scalars (`true`, `42`) are stored typed, everything else
    /// as a string.
    pub fn load_env_from<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env = Value::Object(Default::default());
        let mut found = false;

        for (name, raw) in vars {
            let Some((_, key)) = ENV_KEYS.iter().find(|(var, _)| *var == name) else {
                continue;
            };
            let value = match serde_json::from_str::<Value>(raw.trim()) {
                Ok(v) if !v.is_object() && !v.is_array() => v,
                _ => Value::String(raw),
            };
            set_path(&mut env, key, value);
            found = true;
        }

        if found {
            self.layers.insert(ConfigLayer::Environment, env);
        }
    }

    /// Get a configuration value by key, respecting layer priority.
    ///
    /// Returns None if the key doesn't exist in any layer or no layer holds
    /// a value of the requested type.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        for layer in LAYER_ORDER.iter().rev() {
            if let Some(value) = self.layers.get(layer).and_then(|data| get_path(data, key)) {
                if let Ok(typed_value) = serde_json::from_value(value.clone()) {
                    return Some(typed_value);
                }
            }
        }

        None
    }

    /// Set a configuration value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        if key.is_empty() {
            return Err(SantaError::config("key", "configuration key cannot be empty"));
        }
        let value = serde_json::to_value(value)
            .map_err(|e| SantaError::config(key, format!("failed to serialize value: {}", e)))?;

        let set_layer = self
            .layers
            .entry(ConfigLayer::Set)
            .or_insert(Value::Object(Default::default()));
        set_path(set_layer, key, value);

        Ok(())
    }

    /// Get merged data from all layers.
    pub fn merged_data(&self) -> Value {
        let mut merged = Value::Object(serde_json::Map::new());

        for layer in &LAYER_ORDER {
            if let Some(layer_data) = self.layers.get(layer) {
                merged = deep_merge(merged, layer_data.clone());
            }
        }

        merged
    }

    /// Path the configuration was loaded from, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

/// Default upper bound on template size in bytes.
pub const DEFAULT_MAX_TEMPLATE_SIZE: usize = 1024 * 1024;

/// Typed engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Render masked previews instead of real output
    #[serde(default, deserialize_with = "lenient_bool")]
    pub dry_run: bool,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Largest template accepted, in bytes
    #[serde(default = "default_max_template_size")]
    pub max_template_size: usize,
}

fn default_max_template_size() -> usize {
    DEFAULT_MAX_TEMPLATE_SIZE
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().map(|v| v != 0).unwrap_or(false)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean: {}", other))),
        },
        Value::Null => Ok(false),
        other => Err(D::Error::custom(format!("invalid boolean: {}", other))),
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: false,
            log: LogConfig::default(),
            max_template_size: DEFAULT_MAX_TEMPLATE_SIZE,
        }
    }
}

impl Settings {
    /// Resolve settings from every layer of `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        serde_json::from_value(config.merged_data())
            .map_err(|e| SantaError::config("settings", format!("failed to parse settings: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use santa_types::{LogFormat, LogLevel};
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_config(&Config::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log.level, LogLevel::Info);
        assert_eq!(settings.max_template_size, DEFAULT_MAX_TEMPLATE_SIZE);
    }

    #[test]
    fn test_layer_priority() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dry_run: true\nlog:\n  level: debug\n  format: compact").unwrap();

        let mut config = Config::load(file.path()).unwrap();
        assert_eq!(config.get::<String>("log.level").as_deref(), Some("debug"));

        config.set("log.level", "warn").unwrap();
        assert_eq!(config.get::<String>("log.level").as_deref(), Some("warn"));

        config.load_env_from(vars(&[
            ("SANTA_LOG_LEVEL", "trace"),
            ("SANTA_DRY_RUN", "false"),
            ("HOME", "/root"),
        ]));

        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.log.level, LogLevel::Trace);
        assert_eq!(settings.log.format, LogFormat::Compact);
        assert!(!settings.dry_run);
        assert_eq!(config.get::<String>("home"), None);
    }

    #[test]
    fn test_env_values_are_typed() {
        let mut config = Config::new();
        config.load_env_from(vars(&[
            ("SANTA_MAX_TEMPLATE_SIZE", "2048"),
            ("SANTA_DRY_RUN", "yes"),
        ]));
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.max_template_size, 2048);
        assert!(settings.dry_run);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(Settings::from_config(&config).unwrap(), Settings::default());
        assert!(config.file_path().is_some());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log: [unclosed").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "config_file"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = Config::new();
        config.set("log.level", "shouty").unwrap();
        assert!(Settings::from_config(&config).is_err());
    }

    proptest! {
        #[test]
        fn prop_set_keeps_sibling_keys(
            section in "[a-z]{1,8}",
            key in "[a-z]{1,8}",
            sibling in "[a-z]{1,8}",
            value: i64,
        ) {
            prop_assume!(key != sibling);
            let mut config = Config::new();
            config.set(&format!("{}.{}", section, sibling), "kept").unwrap();
            config.set(&format!("{}.{}", section, key), value).unwrap();

            prop_assert_eq!(config.get::<i64>(&format!("{}.{}", section, key)), Some(value));
            let kept = config.get::<String>(&format!("{}.{}", section, sibling));
            prop_assert_eq!(
                kept.as_deref(),
                Some("kept")
            );
        }
    }
}
