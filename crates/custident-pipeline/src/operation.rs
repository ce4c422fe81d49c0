use custident_transform::{FailurePolicy, Selector};
use serde::{Deserialize, Serialize};

/// Declarative description of one gateway operation.
///
/// Loaded once and treated as immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationConfig {
    pub name: String,
    /// Fields forwarded upstream. `None` forwards the request body unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Selector>,
    /// Fields returned to the caller on success. `None` forwards the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Selector>,
    #[serde(default)]
    pub failure: FailurePolicy,
}

impl OperationConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            request: None,
            response: None,
            failure: FailurePolicy::default(),
        }
    }

    pub fn with_request(mut self, selector: Selector) -> Self {
        self.request = Some(selector);
        self
    }

    pub fn with_response(mut self, selector: Selector) -> Self {
        self.response = Some(selector);
        self
    }

    pub fn with_failure(mut self, failure: FailurePolicy) -> Self {
        self.failure = failure;
        self
    }
}
