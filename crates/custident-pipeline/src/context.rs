use std::collections::BTreeMap;

use serde_json::Value;

/// Well-known variable names shared with the hosting gateway.
pub mod vars {
    pub const REQUEST_CONSUMER_REQUEST_ID: &str = "request.header.consumerRequestId";
    pub const REQUEST_TOKEN: &str = "request.header.token";
    pub const REQUEST_SESSION_ID: &str = "request.header.sessionId";
    pub const REQUEST_CONTENT: &str = "request.content";

    pub const RESPONSE_STATUS_CODE: &str = "response.status.code";
    pub const RESPONSE_CONTENT: &str = "response.content";

    /// Upstream error fields forwarded by response shaping.
    pub const STATUS_CODE: &str = "statusCode";
    pub const STATUS: &str = "status";
    pub const MESSAGE: &str = "message";

    /// Normalized envelope written by fault normalization.
    pub const FAILED_STATUS_CODE: &str = "failed_response.statusCode";
    pub const FAILED_STATUS: &str = "failed_response.status";
    pub const FAILED_MESSAGE: &str = "failed_response.message";

    pub const VALID_SCHEMA: &str = "validSchema";
    pub const SCHEMA_EVALUATE_VALID: &str = "schemaEvaluate.valid";
}

/// Variable storage a step reads its inputs from and writes its outputs to.
///
/// The hosting gateway owns the real storage; steps only see this trait.
pub trait RequestContext {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
}

/// In-memory context that records every write in order.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    values: BTreeMap<String, Value>,
    writes: Vec<(String, Value)>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a variable without recording it as a write.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Writes performed since creation or the last [`clear_writes`](Self::clear_writes).
    pub fn writes(&self) -> &[(String, Value)] {
        &self.writes
    }

    /// Value of the most recent write to `key`.
    pub fn written(&self, key: &str) -> Option<&Value> {
        self.writes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl RequestContext for VariableContext {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.writes.push((key.to_string(), value.clone()));
        self.values.insert(key.to_string(), value);
    }
}

/// Read a variable as it is stored. `null` counts as unset.
pub fn get_value(ctx: &dyn RequestContext, key: &str) -> Option<Value> {
    ctx.get(key).filter(|value| !value.is_null())
}

/// Read a variable as text. Strings are returned as-is, other values as JSON.
pub fn get_text(ctx: &dyn RequestContext, key: &str) -> Option<String> {
    match ctx.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Read a status code stored either as a number or as numeric text.
pub fn get_status_code(ctx: &dyn RequestContext, key: &str) -> Option<u16> {
    match ctx.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
