//! Data structure manipulation on JSON values.

use serde_json::Value;

/// Deep merge two values.
/// Recursively merges objects, with overlay values taking precedence.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    match (&mut base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_val) => {
                        let current = std::mem::take(base_val);
                        *base_val = deep_merge(current, overlay_val);
                    }
                    None => {
                        base_map.insert(key, overlay_val);
                    }
                }
            }
            base
        }
        (_, overlay_val) => overlay_val,
    }
}

/// Get value at a path in dotted notation.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// Set value at a dotted path, creating intermediate objects as needed.
///
/// Non-object values along the path are replaced by objects.
pub fn set_path(data: &mut Value, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = match parts.pop() {
        Some(last) => last,
        None => return,
    };

    let mut current = data;
    for part in parts {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        current = match current {
            Value::Object(map) => map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Default::default())),
            _ => return,
        };
    }

    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_nested() {
        let base = json!({"log": {"level": "info", "format": "pretty"}, "dry_run": false});
        let overlay = json!({"log": {"level": "debug"}});
        let merged = deep_merge(base, overlay);
        assert_eq!(
            merged,
            json!({"log": {"level": "debug", "format": "pretty"}, "dry_run": false})
        );
    }

    #[test]
    fn test_deep_merge_scalar_overlay_wins() {
        assert_eq!(deep_merge(json!({"a": 1}), json!(5)), json!(5));
    }

    #[test]
    fn test_get_path() {
        let data = json!({"a": {"b": [10, 20]}});
        assert_eq!(get_path(&data, "a.b.1"), Some(&json!(20)));
        assert_eq!(get_path(&data, "a.c"), None);
        assert_eq!(get_path(&data, "a.b.x"), None);
    }

    #[test]
    fn test_set_path_creates_parents() {
        let mut data = json!({"log": "oops"});
        set_path(&mut data, "log.level", json!("trace"));
        set_path(&mut data, "dry_run", json!(true));
        assert_eq!(data, json!({"log": {"level": "trace"}, "dry_run": true}));
    }
}
