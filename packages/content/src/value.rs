use serde_json::Value;

/// Text form of a resolved value as it appears in rendered output.
///
/// Strings are emitted verbatim, `null` renders empty, and containers fall
/// back to compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
