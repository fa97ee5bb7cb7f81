//! Typed generator configuration.
//!
//! Generator settings arrive as loosely typed JSON (numbers may be floats or
//! numeric strings, booleans may be strings, a list may be a lone string).
//! Each generator declares a `#[derive(Deserialize)] #[serde(default)]`
//! settings struct whose `Default` holds the documented defaults, and marks
//! loosely typed fields with the [`lenient`] helpers. [`parse_config`] turns
//! any failure into [`SantaError::Config`] naming the offending field.

use santa_types::{Result, SantaError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Decode generator settings from the raw config value.
///
/// `null` is treated as an empty object, and `null` fields as absent.
pub fn parse_config<T: DeserializeOwned>(value: &Value) -> Result<T> {
    let mut object = match value {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(SantaError::Parse(format!(
                "generator config must be a JSON object, got {}",
                json_kind(other)
            )))
        }
    };
    object.retain(|_, v| !v.is_null());

    serde_path_to_error::deserialize(Value::Object(object)).map_err(|e| {
        let field = e.path().to_string();
        SantaError::config(field, e.into_inner().to_string())
    })
}

/// A required string setting: present and not blank.
pub fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(SantaError::config(field, format!("{} is required", field))),
    }
}

/// `deserialize_with` helpers for loosely typed settings.
pub mod lenient {
    use serde::de::{Deserialize, Deserializer, Error};
    use serde_json::Value;

    use super::json_kind;

    /// Integer from a JSON integer, an integral float or a numeric string.
    pub fn integer<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i128>,
    {
        let value = Value::deserialize(deserializer)?;
        let wide = coerce_integer(&value).map_err(D::Error::custom)?;
        T::try_from(wide).map_err(|_| D::Error::custom(format!("value {} is out of range", wide)))
    }

    /// [`integer`] for `Option` fields.
    pub fn optional_integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i128>,
    {
        integer(deserializer).map(Some)
    }

    /// Boolean from a JSON boolean or a `"true"`/`"false"` string.
    pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Bool(b) => Ok(b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(D::Error::custom(format!("expected a boolean, got \"{}\"", s))),
            },
            other => Err(D::Error::custom(format!(
                "expected a boolean, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// String, rejecting other JSON types by name.
    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            other => Err(D::Error::custom(format!(
                "expected a string, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// [`string`] for `Option` fields.
    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        string(deserializer).map(Some)
    }

    /// List of strings. A single string is accepted as a one-element list.
    pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(vec![s]),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s),
                    other => Err(D::Error::custom(format!(
                        "item {}: expected a string, got {}",
                        i,
                        json_kind(&other)
                    ))),
                })
                .collect(),
            other => Err(D::Error::custom(format!(
                "expected a list of strings, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn coerce_integer(value: &Value) -> Result<i128, String> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Ok(u as i128)
                } else {
                    n.as_f64()
                        .ok_or_else(|| format!("invalid number {}", n))
                        .and_then(integral_float)
                }
            }
            Value::String(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<i128>() {
                    Ok(i) => Ok(i),
                    Err(_) => trimmed
                        .parse::<f64>()
                        .map_err(|_| format!("expected an integer, got \"{}\"", s))
                        .and_then(integral_float),
                }
            }
            other => Err(format!("expected an integer, got {}", json_kind(other))),
        }
    }

    fn integral_float(f: f64) -> Result<i128, String> {
        if !f.is_finite() || f.fract() != 0.0 {
            return Err(format!("expected an integer, got {}", f));
        }
        if f.abs() > 1e30 {
            return Err(format!("value {} is out of range", f));
        }
        Ok(f as i128)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "lenient::integer")]
        length: u32,
        #[serde(deserialize_with = "lenient::optional_integer")]
        offset: Option<i64>,
        #[serde(deserialize_with = "lenient::boolean")]
        enabled: bool,
        #[serde(deserialize_with = "lenient::optional_string")]
        name: Option<String>,
        #[serde(deserialize_with = "lenient::string_list")]
        names: Vec<String>,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                length: 9,
                offset: None,
                enabled: true,
                name: None,
                names: Vec::new(),
            }
        }
    }

    fn sample(value: Value) -> Result<Sample> {
        parse_config(&value)
    }

    #[test]
    fn test_integer_coercion() {
        for raw in [json!(16), json!(16.0), json!("16"), json!(" 16.0 ")] {
            assert_eq!(sample(json!({"length": raw})).unwrap().length, 16, "{}", raw);
        }
        assert_eq!(sample(json!({"length": null})).unwrap().length, 9);
        assert_eq!(sample(json!({})).unwrap().length, 9);
        assert_eq!(sample(json!({"offset": "-1"})).unwrap().offset, Some(-1));
    }

    #[test]
    fn test_integer_rejections() {
        let err = sample(json!({"length": 16.5})).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "length"));
        assert!(sample(json!({"length": "sixteen"})).is_err());
        assert!(sample(json!({"offset": [1]})).is_err());

        let err = sample(json!({"length": -1})).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration for `length`: value -1 is out of range");
    }

    #[test]
    fn test_boolean_and_strings() {
        assert!(!sample(json!({"enabled": "FALSE"})).unwrap().enabled);
        assert!(sample(json!({})).unwrap().enabled);
        let err = sample(json!({"enabled": 3})).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration for `enabled`: expected a boolean, got a number");

        assert_eq!(sample(json!({"name": "x"})).unwrap().name.as_deref(), Some("x"));
        let err = sample(json!({"name": true})).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "name"));

        assert_eq!(sample(json!({"names": ["a", "b"]})).unwrap().names, vec!["a", "b"]);
        assert_eq!(sample(json!({"names": "c"})).unwrap().names, vec!["c"]);
        let err = sample(json!({"names": ["a", 2]})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration for `names`: item 1: expected a string, got a number"
        );
    }

    #[test]
    fn test_required() {
        let err = required("blank", Some("  ".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration for `blank`: blank is required");
        assert!(required("absent", None).is_err());
        assert_eq!(required("present", Some("v".to_string())).unwrap(), "v");
    }

    #[test]
    fn test_non_object_config_is_parse_error() {
        assert!(matches!(sample(json!([1, 2])), Err(SantaError::Parse(_))));
        assert!(sample(Value::Null).is_ok());
    }
}
