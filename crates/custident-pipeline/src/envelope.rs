use std::fmt;

use serde_json::Value;

use crate::context::{get_text, get_value, vars, RequestContext};
use crate::error::{PipelineError, Result};

/// Identifiers and content carried across a request-side step.
///
/// `consumer_request_id`, `token` and `session_id` are opaque: they keep
/// whatever JSON type the caller sent and are never inspected.
#[derive(Clone, PartialEq)]
pub struct TransferEnvelope {
    pub consumer_request_id: Option<Value>,
    pub token: Option<Value>,
    pub session_id: Option<Value>,
    pub content: Value,
}

impl TransferEnvelope {
    pub fn new(content: Value) -> Self {
        Self {
            consumer_request_id: None,
            token: None,
            session_id: None,
            content,
        }
    }

    /// Read headers and the parsed request content.
    ///
    /// Content that is missing or not JSON is an error; the request side
    /// has no absent-body fallback.
    pub fn read_from(ctx: &dyn RequestContext) -> Result<Self> {
        let raw = get_text(ctx, vars::REQUEST_CONTENT)
            .ok_or(PipelineError::MissingVariable(vars::REQUEST_CONTENT))?;
        let content = serde_json::from_str(&raw).map_err(PipelineError::InvalidContent)?;

        Ok(Self {
            consumer_request_id: get_value(ctx, vars::REQUEST_CONSUMER_REQUEST_ID),
            token: get_value(ctx, vars::REQUEST_TOKEN),
            session_id: get_value(ctx, vars::REQUEST_SESSION_ID),
            content,
        })
    }

    /// Write headers (those present) and the serialized content back.
    pub fn write_to(&self, ctx: &mut dyn RequestContext) {
        let headers = [
            (vars::REQUEST_CONSUMER_REQUEST_ID, &self.consumer_request_id),
            (vars::REQUEST_TOKEN, &self.token),
            (vars::REQUEST_SESSION_ID, &self.session_id),
        ];
        for (key, value) in headers {
            if let Some(value) = value {
                ctx.set(key, value.clone());
            }
        }
        ctx.set(vars::REQUEST_CONTENT, Value::String(self.content.to_string()));
    }
}

impl fmt::Debug for TransferEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("TransferEnvelope");
        dbg.field("consumer_request_id", &self.consumer_request_id);
        match &self.token {
            Some(Value::String(token)) => {
                dbg.field("token", &format_args!("<redacted:{} bytes>", token.len()));
            }
            Some(token) => {
                dbg.field("token", &format_args!("<redacted:{} bytes>", token.to_string().len()));
            }
            None => {
                dbg.field("token", &Option::<Value>::None);
            }
        }
        dbg.field("session_id", &self.session_id)
            .field("content", &self.content)
            .finish()
    }
}
