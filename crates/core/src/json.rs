//! JSON vocabulary for the data layer
//!
//! Wire payloads are plain `serde_json` values; this module hosts the alias
//! and the falsiness rules the serializer's `omit_falsy` paths use.

/// JSON value type used across the data layer
pub type JsonValue = serde_json::Value;

/// Falsiness of a JSON value
///
/// Null, `false`, numeric zero and the empty string are falsy; arrays and
/// objects (even empty ones) are truthy.
pub fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

/// Falsiness of an optional JSON value; absence is falsy
pub fn is_falsy_opt(value: Option<&JsonValue>) -> bool {
    value.map(is_falsy).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_values() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!("")));
    }

    #[test]
    fn test_truthy_values() {
        assert!(!is_falsy(&json!(true)));
        assert!(!is_falsy(&json!(1)));
        assert!(!is_falsy(&json!(-3)));
        assert!(!is_falsy(&json!("x")));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
    }

    #[test]
    fn test_absent_is_falsy() {
        assert!(is_falsy_opt(None));
        assert!(!is_falsy_opt(Some(&json!(1))));
    }
}
