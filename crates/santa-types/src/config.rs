//! Configuration types and structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a render request: which generator to run and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Name the output is exposed under in templates (`.Name.field`)
    pub name: String,
    /// Registered generator type
    #[serde(rename = "type")]
    pub kind: String,
    /// Generator specific settings, decoded by the generator itself
    #[serde(default = "empty_object")]
    pub config: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl GeneratorConfig {
    /// Create an entry with an empty config object.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            config: empty_object(),
        }
    }

    /// Replace the config payload.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

/// Log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level to emit
    #[serde(default)]
    pub level: crate::LogLevel,
    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: crate::LogLevel::Info,
            format: default_log_format(),
        }
    }
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogFormat {
    /// Human-readable format with colors
    Pretty,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = crate::SantaError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(crate::SantaError::config(
                "log.format",
                format!("invalid log format: {}", s),
            )),
        }
    }
}

impl TryFrom<String> for LogFormat {
    type Error = crate::SantaError;

    fn try_from(s: String) -> crate::Result<Self> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generator_config_from_yaml() {
        let yaml = r#"
- name: Password
  type: random_password
  config:
    length: 32
    special: false
- name: Id
  type: random_uuid
"#;
        let entries: Vec<GeneratorConfig> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "random_password");
        assert_eq!(entries[0].config, json!({"length": 32, "special": false}));
        assert_eq!(entries[1].config, json!({}));
    }

    #[test]
    fn test_log_config_defaults() {
        let cfg: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, LogConfig::default());
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);

        let cfg: LogConfig = serde_json::from_str(r#"{"level": "DEBUG", "format": "Json"}"#).unwrap();
        assert_eq!(cfg.level, crate::LogLevel::Debug);
        assert_eq!(cfg.format, LogFormat::Json);
    }
}
