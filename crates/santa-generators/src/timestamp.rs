//! `time_static`: a fixed or current timestamp broken into its parts.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Timelike, Utc};
use santa_types::{Generator, GeneratorKind, GeneratorOutput, Result, SantaError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{lenient, parse_config};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StaticTimeConfig {
    #[serde(deserialize_with = "lenient::string")]
    rfc3339: String,
}

impl StaticTimeConfig {
    fn at(&self) -> Result<DateTime<FixedOffset>> {
        let raw = self.rfc3339.trim();
        if raw.is_empty() {
            return Ok(Utc::now().fixed_offset());
        }
        DateTime::parse_from_rfc3339(raw)
            .map_err(|e| SantaError::config("rfc3339", format!("invalid rfc3339 format: {}", e)))
    }
}

/// `time_static` generator.
///
/// Components are reported in the input's own offset, without padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTimeGenerator;

impl Generator for StaticTimeGenerator {
    fn type_name(&self) -> &'static str {
        GeneratorKind::TimeStatic.type_name()
    }

    fn generate(&self, config: &Value) -> Result<GeneratorOutput> {
        let at = parse_config::<StaticTimeConfig>(config)?.at()?;

        let mut result = HashMap::new();
        result.insert("rfc3339".to_string(), at.to_rfc3339_opts(SecondsFormat::Secs, true));
        result.insert("unix".to_string(), at.timestamp().to_string());
        result.insert("year".to_string(), at.year().to_string());
        result.insert("month".to_string(), at.month().to_string());
        result.insert("day".to_string(), at.day().to_string());
        result.insert("hour".to_string(), at.hour().to_string());
        result.insert("minute".to_string(), at.minute().to_string());
        result.insert("second".to_string(), at.second().to_string());
        Ok(result)
    }

    fn output_keys(&self) -> &[&'static str] {
        &["rfc3339", "unix", "year", "month", "day", "hour", "minute", "second"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixed_timestamp() {
        let out = StaticTimeGenerator
            .generate(&json!({"rfc3339": "2024-03-05T07:08:09Z"}))
            .unwrap();
        assert_eq!(out["rfc3339"], "2024-03-05T07:08:09Z");
        assert_eq!(out["unix"], "1709622489");
        assert_eq!(out["year"], "2024");
        assert_eq!(out["month"], "3");
        assert_eq!(out["day"], "5");
        assert_eq!(out["hour"], "7");
        assert_eq!(out["minute"], "8");
        assert_eq!(out["second"], "9");
    }

    #[test]
    fn test_offset_is_kept() {
        let out = StaticTimeGenerator
            .generate(&json!({"rfc3339": "2024-12-31T23:30:00+05:30"}))
            .unwrap();
        assert_eq!(out["rfc3339"], "2024-12-31T23:30:00+05:30");
        assert_eq!(out["hour"], "23");
        assert_eq!(out["day"], "31");
    }

    #[test]
    fn test_defaults_to_now() {
        let before = Utc::now().timestamp();
        let out = StaticTimeGenerator.generate(&json!({})).unwrap();
        let unix: i64 = out["unix"].parse().unwrap();
        assert!(unix >= before && unix <= Utc::now().timestamp());
        assert!(out["rfc3339"].ends_with('Z'));
    }

    #[test]
    fn test_invalid_timestamp() {
        let err = StaticTimeGenerator
            .generate(&json!({"rfc3339": "yesterday"}))
            .unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "rfc3339"));
        let err = StaticTimeGenerator.generate(&json!({"rfc3339": 1709622489})).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "rfc3339"));
    }
}
