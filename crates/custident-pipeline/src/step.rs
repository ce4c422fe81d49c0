use std::fmt;
use std::sync::Arc;

use custident_schema::SchemaRegistry;
use custident_transform::{
    normalize_fault, project, shape_response, FaultOutcome, ResponseOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{get_status_code, get_text, vars, RequestContext};
use crate::envelope::TransferEnvelope;
use crate::error::{PipelineError, Result};
use crate::operation::OperationConfig;

/// The five step kinds a gateway operation is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// Publish the operation's schema to `validSchema`.
    ProvideSchema,
    /// Gate `request.content` and write `schemaEvaluate.valid`.
    ValidateSchema,
    /// Project the request content through the request selector.
    ShapeRequest,
    /// Shape the upstream response for the caller.
    ShapeResponse,
    /// Normalize a failed upstream response into `failed_response.*`.
    NormalizeFault,
}

impl StepKind {
    pub const ALL: [StepKind; 5] = [
        StepKind::ProvideSchema,
        StepKind::ValidateSchema,
        StepKind::ShapeRequest,
        StepKind::ShapeResponse,
        StepKind::NormalizeFault,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::ProvideSchema => "provideSchema",
            StepKind::ValidateSchema => "validateSchema",
            StepKind::ShapeRequest => "shapeRequest",
            StepKind::ShapeResponse => "shapeResponse",
            StepKind::NormalizeFault => "normalizeFault",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step did to the context.
#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    /// `true` when a schema was written to `validSchema`.
    SchemaProvided(bool),
    /// The validation verdict written to `schemaEvaluate.valid`.
    Validated(bool),
    /// The request content was rewritten.
    RequestShaped,
    Response(ResponseOutcome),
    Fault(FaultOutcome),
}

/// One configured step of one operation.
///
/// A step holds only shared, immutable configuration; all per-request
/// state lives in the context it is run against.
#[derive(Debug, Clone)]
pub struct TransformStep {
    kind: StepKind,
    operation: Arc<OperationConfig>,
    schemas: Option<Arc<SchemaRegistry>>,
}

impl TransformStep {
    pub fn new(kind: StepKind, operation: Arc<OperationConfig>) -> Self {
        Self {
            kind,
            operation,
            schemas: None,
        }
    }

    /// Attach the schema registry used by the schema steps.
    pub fn with_schemas(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn operation(&self) -> &OperationConfig {
        &self.operation
    }

    pub fn run(&self, ctx: &mut dyn RequestContext) -> Result<StepReport> {
        let span = tracing::debug_span!(
            "step",
            operation = %self.operation.name,
            kind = %self.kind
        );
        let _guard = span.enter();

        match self.kind {
            StepKind::ProvideSchema => Ok(self.provide_schema(ctx)),
            StepKind::ValidateSchema => self.validate_schema(ctx),
            StepKind::ShapeRequest => self.shape_request(ctx),
            StepKind::ShapeResponse => self.shape_response(ctx),
            StepKind::NormalizeFault => Ok(self.normalize_fault(ctx)),
        }
    }

    fn registry_schema(&self) -> Option<&Value> {
        self.schemas
            .as_ref()
            .and_then(|schemas| schemas.schema(&self.operation.name))
    }

    fn provide_schema(&self, ctx: &mut dyn RequestContext) -> StepReport {
        match self.registry_schema() {
            Some(schema) => {
                ctx.set(vars::VALID_SCHEMA, schema.clone());
                StepReport::SchemaProvided(true)
            }
            None => {
                tracing::debug!("no schema registered, validSchema left unset");
                StepReport::SchemaProvided(false)
            }
        }
    }

    fn validate_schema(&self, ctx: &mut dyn RequestContext) -> Result<StepReport> {
        let raw = get_text(ctx, vars::REQUEST_CONTENT)
            .ok_or(PipelineError::MissingVariable(vars::REQUEST_CONTENT))?;
        let document: Value = serde_json::from_str(&raw).map_err(PipelineError::InvalidContent)?;

        let valid = self.verdict(ctx, &document)?;
        tracing::debug!(valid, "schema evaluated");
        ctx.set(vars::SCHEMA_EVALUATE_VALID, Value::Bool(valid));
        Ok(StepReport::Validated(valid))
    }

    fn verdict(&self, ctx: &dyn RequestContext, document: &Value) -> Result<bool> {
        if let Some(schemas) = self.schemas.as_deref() {
            if schemas.has_schema(&self.operation.name) {
                return Ok(match schemas.validate(&self.operation.name, document) {
                    Ok(()) => true,
                    Err(custident_schema::SchemaError::ValidationFailed { message, .. }) => {
                        tracing::debug!(%message, "payload rejected");
                        false
                    }
                    Err(err) => return Err(err.into()),
                });
            }
        }

        if let Some(schema) = context_schema(ctx) {
            return Ok(custident_schema::validate(document, &schema));
        }

        Ok(self
            .schemas
            .as_deref()
            .map_or(true, |schemas| !schemas.config().fail_on_missing_schema))
    }

    fn shape_request(&self, ctx: &mut dyn RequestContext) -> Result<StepReport> {
        let mut envelope = TransferEnvelope::read_from(ctx)?;
        if let Some(selector) = &self.operation.request {
            envelope.content = project(&envelope.content, selector)?;
        }
        envelope.write_to(ctx);
        Ok(StepReport::RequestShaped)
    }

    fn shape_response(&self, ctx: &mut dyn RequestContext) -> Result<StepReport> {
        let status_code = get_status_code(ctx, vars::RESPONSE_STATUS_CODE);
        let body = get_text(ctx, vars::RESPONSE_CONTENT);

        let outcome = shape_response(status_code, body.as_deref(), self.operation.response.as_ref())?;
        match &outcome {
            ResponseOutcome::Absent => {}
            ResponseOutcome::Success(shaped) => {
                ctx.set(vars::RESPONSE_CONTENT, Value::String(shaped.to_string()));
            }
            ResponseOutcome::Failure(envelope) => {
                ctx.set(vars::STATUS_CODE, envelope.status_code.clone());
                ctx.set(vars::STATUS, envelope.status.clone());
                ctx.set(vars::MESSAGE, envelope.message.clone());
            }
        }
        Ok(StepReport::Response(outcome))
    }

    fn normalize_fault(&self, ctx: &mut dyn RequestContext) -> StepReport {
        let status_code = get_status_code(ctx, vars::RESPONSE_STATUS_CODE);
        let body = get_text(ctx, vars::RESPONSE_CONTENT);

        let outcome = normalize_fault(status_code, body.as_deref(), &self.operation.failure);
        if let FaultOutcome::Normalized(envelope) = &outcome {
            ctx.set(vars::FAILED_STATUS_CODE, envelope.status_code.clone());
            ctx.set(vars::FAILED_STATUS, envelope.status.clone());
            ctx.set(vars::FAILED_MESSAGE, envelope.message.clone());
        }
        StepReport::Fault(outcome)
    }
}

/// Schema published to the context by an earlier step, as an object or as
/// JSON text.
fn context_schema(ctx: &dyn RequestContext) -> Option<Value> {
    match ctx.get(vars::VALID_SCHEMA)? {
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(schema) => Some(schema),
            Err(err) => {
                tracing::warn!(error = %err, "validSchema is not valid JSON, rejecting payload");
                Some(Value::Bool(false))
            }
        },
        Value::Null => None,
        schema => Some(schema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::context::VariableContext;
    use custident_transform::{ErrorEnvelope, Selector};
    use serde_json::json;

    fn step(kind: StepKind, operation: OperationConfig) -> TransformStep {
        TransformStep::new(kind, Arc::new(operation))
    }

    fn response_ctx(code: u16, body: &str) -> VariableContext {
        VariableContext::new()
            .with(vars::RESPONSE_STATUS_CODE, code)
            .with(vars::RESPONSE_CONTENT, body)
    }

    #[test]
    fn shape_request_keeps_headers_and_trims_content() {
        let mut ctx = VariableContext::new()
            .with(vars::REQUEST_CONSUMER_REQUEST_ID, "req-1")
            .with(vars::REQUEST_TOKEN, "tok")
            .with(
                vars::REQUEST_CONTENT,
                r#"{"sessionDialogueIdentification":"abc","extra":1}"#,
            );

        let report = step(StepKind::ShapeRequest, builtin::execute_onboarding_party())
            .run(&mut ctx)
            .unwrap();

        assert_eq!(report, StepReport::RequestShaped);
        assert_eq!(ctx.written(vars::REQUEST_CONSUMER_REQUEST_ID), Some(&json!("req-1")));
        assert_eq!(ctx.written(vars::REQUEST_TOKEN), Some(&json!("tok")));
        assert!(ctx.written(vars::REQUEST_SESSION_ID).is_none());
        assert_eq!(
            ctx.written(vars::REQUEST_CONTENT),
            Some(&json!(r#"{"sessionDialogueIdentification":"abc"}"#))
        );
    }

    #[test]
    fn shape_request_rejects_unparseable_content() {
        let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, "{not json");
        let err = step(StepKind::ShapeRequest, builtin::retrieve_customer())
            .run(&mut ctx)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidContent(_)));
        assert!(ctx.writes().is_empty());
    }

    #[test]
    fn shape_request_without_content_is_missing_variable() {
        let mut ctx = VariableContext::new();
        let err = step(StepKind::ShapeRequest, builtin::clean_request())
            .run(&mut ctx)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingVariable(vars::REQUEST_CONTENT)));
    }

    #[test]
    fn clean_request_forwards_session_id() {
        let mut ctx = VariableContext::new()
            .with(vars::REQUEST_SESSION_ID, "sess-9")
            .with(vars::REQUEST_CONTENT, r#"{"a":1}"#);
        step(StepKind::ShapeRequest, builtin::clean_request())
            .run(&mut ctx)
            .unwrap();
        assert_eq!(ctx.written(vars::REQUEST_SESSION_ID), Some(&json!("sess-9")));
        assert_eq!(ctx.written(vars::REQUEST_CONTENT), Some(&json!(r#"{"a":1}"#)));
    }

    #[test]
    fn shape_request_structural_mismatch_writes_nothing() {
        let op = OperationConfig::new("x")
            .with_request(Selector::new().object("party", Selector::new().field("id")));
        let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, r#"{"party":"flat"}"#);
        let err = step(StepKind::ShapeRequest, op).run(&mut ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Transform(_)));
        assert!(ctx.writes().is_empty());
    }

    #[test]
    fn shape_response_success_projects_body() {
        let mut ctx = response_ctx(
            200,
            r#"{"partyReference":{"referenceId":"R-1","internal":true},"trace":"x"}"#,
        );
        let report = step(StepKind::ShapeResponse, builtin::execute_onboarding_party())
            .run(&mut ctx)
            .unwrap();

        let expected = json!({ "partyReference": { "referenceId": "R-1" } });
        assert_eq!(report, StepReport::Response(ResponseOutcome::Success(expected.clone())));
        assert_eq!(ctx.writes().len(), 1);
        assert_eq!(
            ctx.written(vars::RESPONSE_CONTENT),
            Some(&Value::String(expected.to_string()))
        );
    }

    #[test]
    fn shape_response_failure_forwards_upstream_fields() {
        let mut ctx = response_ctx(404, r#"{"statusCode":"404","status":"Not Found","message":"nope"}"#);
        step(StepKind::ShapeResponse, builtin::retrieve_customer())
            .run(&mut ctx)
            .unwrap();

        assert_eq!(ctx.written(vars::STATUS_CODE), Some(&json!("404")));
        assert_eq!(ctx.written(vars::STATUS), Some(&json!("Not Found")));
        assert_eq!(ctx.written(vars::MESSAGE), Some(&json!("nope")));
        assert!(ctx.written(vars::RESPONSE_CONTENT).is_none());
    }

    #[test]
    fn shape_response_absent_body_writes_nothing() {
        for body in ["", "null", "{}", "[]", "42", "<html>"] {
            let mut ctx = response_ctx(200, body);
            let report = step(StepKind::ShapeResponse, builtin::retrieve_customer())
                .run(&mut ctx)
                .unwrap();
            assert_eq!(report, StepReport::Response(ResponseOutcome::Absent), "body {body:?}");
            assert!(ctx.writes().is_empty());
        }
    }

    #[test]
    fn shape_response_reads_textual_status_code() {
        let mut ctx = VariableContext::new()
            .with(vars::RESPONSE_STATUS_CODE, "200")
            .with(vars::RESPONSE_CONTENT, r#"{"any":"thing"}"#);
        let report = step(StepKind::ShapeResponse, builtin::clean_request())
            .run(&mut ctx)
            .unwrap();
        assert_eq!(
            report,
            StepReport::Response(ResponseOutcome::Success(json!({ "any": "thing" })))
        );
    }

    #[test]
    fn normalize_fault_writes_failed_response() {
        let mut ctx = response_ctx(500, r#"{"message":"boom"}"#);
        let report = step(StepKind::NormalizeFault, builtin::execute_onboarding_party())
            .run(&mut ctx)
            .unwrap();

        let expected = ErrorEnvelope {
            status_code: json!(500),
            status: json!("Fail"),
            message: json!("Error General"),
        };
        assert_eq!(report, StepReport::Fault(FaultOutcome::Normalized(expected)));
        assert_eq!(ctx.written(vars::FAILED_STATUS_CODE), Some(&json!(500)));
        assert_eq!(ctx.written(vars::FAILED_STATUS), Some(&json!("Fail")));
        assert_eq!(ctx.written(vars::FAILED_MESSAGE), Some(&json!("Error General")));
    }

    #[test]
    fn normalize_fault_card_prefers_body_status_code() {
        let mut ctx = response_ctx(500, r#"{"statusCode":"409"}"#);
        step(StepKind::NormalizeFault, builtin::retrieve_customer_card())
            .run(&mut ctx)
            .unwrap();
        assert_eq!(ctx.written(vars::FAILED_STATUS_CODE), Some(&json!("409")));
        assert_eq!(ctx.written(vars::FAILED_STATUS), Some(&json!("Failed")));
    }

    #[test]
    fn normalize_fault_passes_complete_envelope_through() {
        let mut ctx = response_ctx(
            400,
            r#"{"statusCode":400,"status":"Bad Request","message":"invalid"}"#,
        );
        let report = step(StepKind::NormalizeFault, builtin::retrieve_customer())
            .run(&mut ctx)
            .unwrap();
        assert_eq!(report, StepReport::Fault(FaultOutcome::PassThrough));
        assert!(ctx.writes().is_empty());
    }

    #[test]
    fn normalize_fault_without_body_uses_fallbacks() {
        let mut ctx = VariableContext::new().with(vars::RESPONSE_STATUS_CODE, 502);
        step(StepKind::NormalizeFault, builtin::retrieve_payment_balances_facility())
            .run(&mut ctx)
            .unwrap();
        assert_eq!(ctx.written(vars::FAILED_STATUS_CODE), Some(&json!(502)));
        assert_eq!(
            ctx.written(vars::FAILED_STATUS),
            Some(&json!("invalid response format"))
        );
    }

    fn registry() -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                "retrieveAlias",
                r#"{"type":"object","required":["alias"],"properties":{"alias":{"type":"string"}}}"#,
            )
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn validate_schema_uses_registry() {
        let validate = step(StepKind::ValidateSchema, OperationConfig::new("retrieveAlias"))
            .with_schemas(registry());

        let mut ok = VariableContext::new().with(vars::REQUEST_CONTENT, r#"{"alias":"x"}"#);
        assert_eq!(validate.run(&mut ok).unwrap(), StepReport::Validated(true));
        assert_eq!(ok.written(vars::SCHEMA_EVALUATE_VALID), Some(&json!(true)));

        let mut bad = VariableContext::new().with(vars::REQUEST_CONTENT, r#"{"alias":7}"#);
        assert_eq!(validate.run(&mut bad).unwrap(), StepReport::Validated(false));
        assert_eq!(bad.written(vars::SCHEMA_EVALUATE_VALID), Some(&json!(false)));
    }

    #[test]
    fn validate_schema_falls_back_to_context_schema() {
        let validate = step(StepKind::ValidateSchema, OperationConfig::new("other"));
        let schema = r#"{"type":"object","required":["id"]}"#;

        let mut as_text = VariableContext::new()
            .with(vars::VALID_SCHEMA, schema)
            .with(vars::REQUEST_CONTENT, r#"{"name":"x"}"#);
        assert_eq!(validate.run(&mut as_text).unwrap(), StepReport::Validated(false));

        let mut as_object = VariableContext::new()
            .with(vars::VALID_SCHEMA, serde_json::from_str::<Value>(schema).unwrap())
            .with(vars::REQUEST_CONTENT, r#"{"id":1}"#);
        assert_eq!(validate.run(&mut as_object).unwrap(), StepReport::Validated(true));

        let mut garbled = VariableContext::new()
            .with(vars::VALID_SCHEMA, "{oops")
            .with(vars::REQUEST_CONTENT, r#"{"id":1}"#);
        assert_eq!(validate.run(&mut garbled).unwrap(), StepReport::Validated(false));
    }

    #[test]
    fn validate_schema_without_any_schema() {
        let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, r#"{"id":1}"#);
        let lenient = step(StepKind::ValidateSchema, OperationConfig::new("other"));
        assert_eq!(lenient.run(&mut ctx).unwrap(), StepReport::Validated(true));

        let strict = Arc::new(SchemaRegistry::with_config(custident_schema::RegistryConfig {
            fail_on_missing_schema: true,
            ..Default::default()
        }));
        let gated = step(StepKind::ValidateSchema, OperationConfig::new("other")).with_schemas(strict);
        assert_eq!(gated.run(&mut ctx).unwrap(), StepReport::Validated(false));
    }

    #[test]
    fn provide_schema_publishes_registry_schema() {
        let provide = step(StepKind::ProvideSchema, OperationConfig::new("retrieveAlias"))
            .with_schemas(registry());
        let mut ctx = VariableContext::new();
        assert_eq!(provide.run(&mut ctx).unwrap(), StepReport::SchemaProvided(true));
        assert_eq!(
            ctx.written(vars::VALID_SCHEMA).and_then(|s| s.get("required")),
            Some(&json!(["alias"]))
        );

        let missing = step(StepKind::ProvideSchema, OperationConfig::new("other"));
        let mut ctx = VariableContext::new();
        assert_eq!(missing.run(&mut ctx).unwrap(), StepReport::SchemaProvided(false));
        assert!(ctx.writes().is_empty());
    }

    #[test]
    fn provide_then_validate_round_trips_through_context() {
        let registry = registry();
        let op = Arc::new(OperationConfig::new("retrieveAlias"));
        let provide = TransformStep::new(StepKind::ProvideSchema, op).with_schemas(registry);
        let validate = step(StepKind::ValidateSchema, OperationConfig::new("retrieveAlias"));

        let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, r#"{"alias":"x"}"#);
        provide.run(&mut ctx).unwrap();
        assert_eq!(validate.run(&mut ctx).unwrap(), StepReport::Validated(true));
    }

    #[test]
    fn step_kind_names_are_camel_case() {
        for kind in StepKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, json!(kind.as_str()));
        }
    }
}
