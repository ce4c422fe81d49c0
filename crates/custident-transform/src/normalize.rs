use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::body::{is_truthy, try_parse};
use crate::error::Result;
use crate::project::project;
use crate::selector::Selector;

/// Message written to every normalized envelope. Upstream messages are
/// never forwarded by fault normalization.
pub const GENERAL_ERROR_MESSAGE: &str = "Error General";
/// Status fallback for customer onboarding.
pub const STATUS_FAIL: &str = "Fail";
/// Status fallback for customer-card retrieval.
pub const STATUS_FAILED: &str = "Failed";
/// Status fallback for generic retrievals.
pub const STATUS_INVALID_RESPONSE_FORMAT: &str = "invalid response format";

const SUCCESS_STATUS: u16 = 200;

/// Binary classification of an upstream status code.
///
/// Only exactly 200 is a success; 201, 204 and every other code fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Success,
    Failure,
}

impl StatusOutcome {
    pub fn classify(status_code: Option<u16>) -> Self {
        if status_code == Some(SUCCESS_STATUS) {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Where a normalized envelope takes its `statusCode` from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusCodeSource {
    /// Always the transport-level status code.
    #[default]
    Transport,
    /// The body's `statusCode`, then its `status`, then the transport code.
    BodyThenTransport,
}

/// Per-operation fallback rules for fault normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FailurePolicy {
    /// `status` written when the upstream body carries none.
    pub status_fallback: String,
    /// `message` written to every normalized envelope.
    pub message: String,
    pub status_code: StatusCodeSource,
}

impl FailurePolicy {
    /// Policy with the given status fallback and the general message.
    pub fn with_fallback(status_fallback: &str) -> Self {
        Self {
            status_fallback: status_fallback.to_string(),
            ..Self::default()
        }
    }

    pub fn status_code_from(mut self, source: StatusCodeSource) -> Self {
        self.status_code = source;
        self
    }

    fn status_code(&self, transport: Option<u16>, body: Option<&Value>) -> Value {
        if self.status_code == StatusCodeSource::BodyThenTransport {
            let from_body = body.and_then(|body| {
                ["statusCode", "status"]
                    .into_iter()
                    .filter_map(|key| body.get(key))
                    .find(|value| is_truthy(value))
            });
            if let Some(value) = from_body {
                return value.clone();
            }
        }
        transport_code(transport)
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            status_fallback: STATUS_INVALID_RESPONSE_FORMAT.to_string(),
            message: GENERAL_ERROR_MESSAGE.to_string(),
            status_code: StatusCodeSource::Transport,
        }
    }
}

/// The uniform `{ statusCode, status, message }` failure shape.
///
/// Values are kept as JSON so a string `"400"` from an upstream stays a
/// string and a numeric code stays a number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorEnvelope {
    pub status_code: Value,
    pub status: Value,
    pub message: Value,
}

impl ErrorEnvelope {
    /// Carry an upstream body's own three fields verbatim.
    pub fn from_upstream(body: &Value) -> Self {
        let field = |key: &str| body.get(key).cloned().unwrap_or(Value::Null);
        Self {
            status_code: field("statusCode"),
            status: field("status"),
            message: field("message"),
        }
    }

    /// True when all three fields are truthy, i.e. the body already is an
    /// error envelope and must not be re-wrapped.
    pub fn is_complete(body: &Value) -> bool {
        ["statusCode", "message", "status"]
            .into_iter()
            .all(|key| body.get(key).is_some_and(is_truthy))
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "statusCode": self.status_code,
            "status": self.status,
            "message": self.message,
        })
    }
}

/// Result of shaping an upstream response on the success path.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// No usable body; nothing is written.
    Absent,
    /// Status 200; the projected body replaces the response content.
    Success(Value),
    /// Any other status; the upstream's own error fields, verbatim.
    Failure(ErrorEnvelope),
}

/// Result of fault normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultOutcome {
    /// The body is already a complete envelope; nothing is written.
    PassThrough,
    /// A normalized envelope built from the body and the policy fallbacks.
    Normalized(ErrorEnvelope),
}

/// Shape an upstream response for the caller.
///
/// Absent, unparseable, `null`, scalar and empty bodies are silently
/// skipped. With status 200 the body is projected through `selector`
/// (forwarded unchanged when there is none); a structural mismatch
/// propagates. Any other status forwards the body's error fields.
pub fn shape_response(
    status_code: Option<u16>,
    raw_body: Option<&str>,
    selector: Option<&Selector>,
) -> Result<ResponseOutcome> {
    let Some(body) = try_parse(raw_body).filter(has_content) else {
        tracing::debug!(?status_code, "response has no usable body, skipping");
        return Ok(ResponseOutcome::Absent);
    };

    match StatusOutcome::classify(status_code) {
        StatusOutcome::Success => {
            let shaped = match selector {
                Some(selector) => project(&body, selector)?,
                None => body,
            };
            tracing::debug!("response classified as success");
            Ok(ResponseOutcome::Success(shaped))
        }
        StatusOutcome::Failure => {
            tracing::debug!(?status_code, "response classified as failure");
            Ok(ResponseOutcome::Failure(ErrorEnvelope::from_upstream(&body)))
        }
    }
}

/// Normalize a failed upstream response into the uniform envelope.
///
/// Never fails: parse faults and missing bodies fall back to the policy
/// text, and a body that already carries a complete envelope passes
/// through untouched.
pub fn normalize_fault(
    status_code: Option<u16>,
    raw_body: Option<&str>,
    policy: &FailurePolicy,
) -> FaultOutcome {
    let body = try_parse(raw_body);

    if body.as_ref().is_some_and(ErrorEnvelope::is_complete) {
        tracing::debug!(?status_code, "upstream body is already an error envelope");
        return FaultOutcome::PassThrough;
    }

    let status = body
        .as_ref()
        .and_then(|body| body.get("status"))
        .filter(|status| is_truthy(status))
        .cloned()
        .unwrap_or_else(|| Value::String(policy.status_fallback.clone()));

    let envelope = ErrorEnvelope {
        status_code: policy.status_code(status_code, body.as_ref()),
        status,
        message: Value::String(policy.message.clone()),
    };
    tracing::debug!(?status_code, body_present = body.is_some(), "normalized upstream failure");
    FaultOutcome::Normalized(envelope)
}

fn has_content(body: &Value) -> bool {
    match body {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn transport_code(status_code: Option<u16>) -> Value {
    status_code.map_or(Value::Null, Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use serde_json::json;

    fn balances_selector() -> Selector {
        Selector::new().object(
            "paymentBalancesFacility",
            Selector::new().fields(&["serviceAmount", "currency"]),
        )
    }

    fn text(value: &Value) -> String {
        value.to_string()
    }

    #[test]
    fn classification_is_exact() {
        assert_eq!(StatusOutcome::classify(Some(200)), StatusOutcome::Success);
        for code in [201, 204, 299, 400, 500] {
            assert_eq!(StatusOutcome::classify(Some(code)), StatusOutcome::Failure);
        }
        assert_eq!(StatusOutcome::classify(None), StatusOutcome::Failure);
    }

    #[test]
    fn shape_success_projects_body() {
        let body = json!({
            "paymentBalancesFacility": {
                "serviceAmount": "8637",
                "currency": "USD",
                "internalLedger": "dropped"
            },
            "trace": "dropped"
        });
        let outcome =
            shape_response(Some(200), Some(&text(&body)), Some(&balances_selector())).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Success(json!({
                "paymentBalancesFacility": { "serviceAmount": "8637", "currency": "USD" }
            }))
        );
    }

    #[test]
    fn shape_without_selector_forwards_body() {
        let body = json!({"anything": [1, 2]});
        let outcome = shape_response(Some(200), Some(&text(&body)), None).unwrap();
        assert_eq!(outcome, ResponseOutcome::Success(body));
    }

    #[test]
    fn shape_non_200_forwards_upstream_fields() {
        let body = json!({"statusCode": "400", "message": "msg", "status": "error"});
        let outcome =
            shape_response(Some(400), Some(&text(&body)), Some(&balances_selector())).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Failure(ErrorEnvelope {
                status_code: json!("400"),
                status: json!("error"),
                message: json!("msg"),
            })
        );
    }

    #[test]
    fn shape_201_is_failure_even_when_well_formed() {
        let body = json!({"paymentBalancesFacility": {"currency": "USD"}});
        let outcome =
            shape_response(Some(201), Some(&text(&body)), Some(&balances_selector())).unwrap();
        assert!(matches!(outcome, ResponseOutcome::Failure(_)));
    }

    #[test]
    fn shape_absence_is_silent() {
        for raw in [None, Some(""), Some("not json"), Some("null"), Some("{}"), Some("[]"), Some("7")] {
            assert_eq!(
                shape_response(Some(200), raw, Some(&balances_selector())).unwrap(),
                ResponseOutcome::Absent,
                "raw body {raw:?}"
            );
            assert_eq!(
                shape_response(Some(500), raw, None).unwrap(),
                ResponseOutcome::Absent
            );
        }
    }

    #[test]
    fn shape_success_structural_mismatch_propagates() {
        let body = json!({"somethingElse": true});
        let err = shape_response(Some(200), Some(&text(&body)), Some(&balances_selector()))
            .unwrap_err();
        assert!(matches!(err, TransformError::StructuralMismatch { .. }));
    }

    #[test]
    fn fault_status_only_body_uses_transport_code() {
        let policy = FailurePolicy::with_fallback(STATUS_FAIL);
        let outcome = normalize_fault(Some(500), Some(r#"{"status":"Fail"}"#), &policy);
        assert_eq!(
            outcome,
            FaultOutcome::Normalized(ErrorEnvelope {
                status_code: json!(500),
                status: json!("Fail"),
                message: json!(GENERAL_ERROR_MESSAGE),
            })
        );
    }

    #[test]
    fn fault_null_body_uses_fallbacks() {
        let policy = FailurePolicy::default();
        let outcome = normalize_fault(Some(500), Some("null"), &policy);
        assert_eq!(
            outcome,
            FaultOutcome::Normalized(ErrorEnvelope {
                status_code: json!(500),
                status: json!(STATUS_INVALID_RESPONSE_FORMAT),
                message: json!("Error General"),
            })
        );
    }

    #[test]
    fn fault_unparseable_and_absent_bodies_use_fallbacks() {
        let policy = FailurePolicy::with_fallback(STATUS_FAIL);
        for raw in [None, Some("<html/>")] {
            let FaultOutcome::Normalized(envelope) = normalize_fault(Some(502), raw, &policy) else {
                panic!("expected normalized envelope for {raw:?}");
            };
            assert_eq!(envelope.status_code, json!(502));
            assert_eq!(envelope.status, json!("Fail"));
        }
    }

    #[test]
    fn fault_complete_envelope_passes_through() {
        let body = r#"{"statusCode":"400","message":"msg","status":"error"}"#;
        for policy in [
            FailurePolicy::default(),
            FailurePolicy::with_fallback(STATUS_FAILED)
                .status_code_from(StatusCodeSource::BodyThenTransport),
        ] {
            assert_eq!(normalize_fault(Some(500), Some(body), &policy), FaultOutcome::PassThrough);
            assert_eq!(normalize_fault(None, Some(body), &policy), FaultOutcome::PassThrough);
        }
    }

    #[test]
    fn fault_empty_fields_are_not_an_envelope() {
        let body = r#"{"statusCode":"","message":"msg","status":"error"}"#;
        let outcome = normalize_fault(Some(500), Some(body), &FailurePolicy::default());
        assert_eq!(
            outcome,
            FaultOutcome::Normalized(ErrorEnvelope {
                status_code: json!(500),
                status: json!("error"),
                message: json!("Error General"),
            })
        );
    }

    #[test]
    fn fault_body_without_signal_uses_fallback_status() {
        let outcome = normalize_fault(Some(500), Some(r#"{"error":"error"}"#), &FailurePolicy::default());
        let FaultOutcome::Normalized(envelope) = outcome else {
            panic!("expected normalized envelope");
        };
        assert_eq!(envelope.status, json!(STATUS_INVALID_RESPONSE_FORMAT));
        assert_eq!(envelope.message, json!("Error General"));
    }

    #[test]
    fn fault_body_then_transport_prefers_body() {
        let policy =
            FailurePolicy::with_fallback(STATUS_FAILED).status_code_from(StatusCodeSource::BodyThenTransport);

        let FaultOutcome::Normalized(envelope) =
            normalize_fault(Some(500), Some(r#"{"status":"500"}"#), &policy)
        else {
            panic!("expected normalized envelope");
        };
        assert_eq!(envelope.status_code, json!("500"));
        assert_eq!(envelope.status, json!("500"));

        let FaultOutcome::Normalized(envelope) =
            normalize_fault(Some(503), Some(r#"{"statusCode":409,"message":"m"}"#), &policy)
        else {
            panic!("expected normalized envelope");
        };
        assert_eq!(envelope.status_code, json!(409));
        assert_eq!(envelope.status, json!(STATUS_FAILED));

        let FaultOutcome::Normalized(envelope) = normalize_fault(Some(500), Some("null"), &policy)
        else {
            panic!("expected normalized envelope");
        };
        assert_eq!(envelope.status_code, json!(500));
        assert_eq!(envelope.status, json!(STATUS_FAILED));
    }

    #[test]
    fn fault_without_transport_code_writes_null() {
        let FaultOutcome::Normalized(envelope) =
            normalize_fault(None, Some(r#"{"error":"error"}"#), &FailurePolicy::default())
        else {
            panic!("expected normalized envelope");
        };
        assert_eq!(envelope.status_code, Value::Null);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: FailurePolicy =
            serde_json::from_value(json!({"statusFallback": "Failed", "statusCode": "bodyThenTransport"}))
                .unwrap();
        assert_eq!(policy.status_fallback, "Failed");
        assert_eq!(policy.message, GENERAL_ERROR_MESSAGE);
        assert_eq!(policy.status_code, StatusCodeSource::BodyThenTransport);
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let envelope = ErrorEnvelope {
            status_code: json!(500),
            status: json!("Fail"),
            message: json!("Error General"),
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"statusCode": 500, "status": "Fail", "message": "Error General"})
        );
        assert_eq!(envelope.to_value(), serde_json::to_value(&envelope).unwrap());
    }
}
