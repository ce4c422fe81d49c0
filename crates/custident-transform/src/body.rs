use serde_json::Value;

/// Parse raw body text, folding every "no usable body" case into `None`.
///
/// Absent text, text that is not JSON and the JSON literal `null` all
/// yield `None`; parse faults never escape.
pub fn try_parse(raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(error = %err, "body is not JSON, treating as absent");
            None
        }
    }
}

/// Loose truthiness used for presence checks on upstream fields.
///
/// Empty strings, `0`, `false` and `null` are falsy; objects and arrays
/// are always truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub(crate) fn kind_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "absent",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}
