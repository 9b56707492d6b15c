//! Conversions between the JSON/YAML data loaded from disk and the
//! [`gtmpl::Value`]s handed to templates, plus the JavaScript-style
//! stringification the template helpers rely on.

use gtmpl_value::Value;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

/// Converts a JSON value into a template value. Objects become
/// [`Value::Map`]s: a missing key then evaluates to "no value" instead of
/// failing the template, which optional front-matter fields rely on.
pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        Json::Object(map) => from_json_map(map),
    }
}

/// Converts a JSON object into a [`Value::Map`].
pub fn from_json_map(map: &Map<String, Json>) -> Value {
    Value::Map(
        map.iter()
            .map(|(k, v)| (k.clone(), from_json(v)))
            .collect::<HashMap<String, Value>>(),
    )
}

/// Renders a value the way JavaScript's `String(value)` would. Helpers that
/// take "any" input compare and parse this representation.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::NoValue => "undefined".to_owned(),
        Value::Nil => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                // `[null, undefined].join()` renders empty slots.
                Value::Nil | Value::NoValue => String::new(),
                _ => stringify(item),
            })
            .collect::<Vec<String>>()
            .join(","),
        Value::Object(_) | Value::Map(_) => "[object Object]".to_owned(),
        _ => "function".to_owned(),
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_owned()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else {
        // Rust prints integral floats without a fractional part, like JS.
        f.to_string()
    }
}

/// Looks up `key` on an object-like value.
pub fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(m) | Value::Map(m) => m.get(key),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify_like_javascript() {
        assert_eq!(stringify(&Value::NoValue), "undefined");
        assert_eq!(stringify(&Value::Nil), "null");
        assert_eq!(stringify(&Value::Bool(false)), "false");
        assert_eq!(stringify(&Value::from(42i64)), "42");
        assert_eq!(stringify(&Value::from(1.5f64)), "1.5");
        assert_eq!(stringify(&Value::from(2.0f64)), "2");
        assert_eq!(
            stringify(&from_json(&json!(["a", 1, null, true]))),
            "a,1,,true"
        );
        assert_eq!(stringify(&from_json(&json!({"a": 1}))), "[object Object]");
    }

    #[test]
    fn test_from_json_object_fields() {
        let value = from_json(&json!({"title": "Intro", "heading": false, "n": 3}));
        match field(&value, "title") {
            Some(Value::String(s)) => assert_eq!(s, "Intro"),
            _ => panic!("title should be a string"),
        }
        match field(&value, "heading") {
            Some(Value::Bool(false)) => {}
            _ => panic!("heading should be false"),
        }
        assert!(field(&value, "missing").is_none());
    }
}
