use std::sync::Arc;

use custident_schema::SchemaRegistry;
use custident_transform::{try_parse, ErrorEnvelope, FaultOutcome, ResponseOutcome};
use serde_json::Value;

use crate::catalog::OperationCatalog;
use crate::context::{vars, RequestContext, VariableContext};
use crate::envelope::TransferEnvelope;
use crate::error::Result;
use crate::operation::OperationConfig;
use crate::step::{StepKind, StepReport, TransformStep};

/// `statusCode` returned to the caller when request validation fails.
pub const SCHEMA_REJECTION_STATUS: u16 = 400;

/// What the upstream service answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status_code: Option<u16>,
    pub body: Option<String>,
}

impl UpstreamResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            body: Some(body.into()),
        }
    }
}

/// The upstream collaborator a shaped request is sent to.
pub trait Upstream {
    fn send(&self, operation: &str, request: &TransferEnvelope) -> Result<UpstreamResponse>;
}

impl<F> Upstream for F
where
    F: Fn(&str, &TransferEnvelope) -> Result<UpstreamResponse>,
{
    fn send(&self, operation: &str, request: &TransferEnvelope) -> Result<UpstreamResponse> {
        self(operation, request)
    }
}

/// A caller request as received by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    pub consumer_request_id: Option<String>,
    pub token: Option<String>,
    pub session_id: Option<String>,
    pub body: String,
}

impl InboundRequest {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    fn seed(&self) -> VariableContext {
        let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, self.body.as_str());
        let headers = [
            (vars::REQUEST_CONSUMER_REQUEST_ID, &self.consumer_request_id),
            (vars::REQUEST_TOKEN, &self.token),
            (vars::REQUEST_SESSION_ID, &self.session_id),
        ];
        for (key, value) in headers {
            if let Some(value) = value {
                ctx = ctx.with(key, value.as_str());
            }
        }
        ctx
    }
}

/// What the caller finally receives.
#[derive(Debug, Clone, PartialEq)]
pub enum CallerResponse {
    Success(Value),
    Failure(ErrorEnvelope),
}

impl CallerResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, CallerResponse::Success(_))
    }

    pub fn to_value(&self) -> Value {
        match self {
            CallerResponse::Success(body) => body.clone(),
            CallerResponse::Failure(envelope) => envelope.to_value(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Gate requests through the schema registry before shaping.
    pub validate_requests: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validate_requests: true,
        }
    }
}

/// Runs the full request/response path for catalog operations.
///
/// Cheap to share across threads; every call builds its own context.
#[derive(Debug, Clone)]
pub struct Pipeline {
    catalog: Arc<OperationCatalog>,
    schemas: Option<Arc<SchemaRegistry>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(catalog: Arc<OperationCatalog>) -> Self {
        Self {
            catalog,
            schemas: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_schemas(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    pub fn schemas(&self) -> Option<&SchemaRegistry> {
        self.schemas.as_deref()
    }

    /// Build one step of `operation`, wired to this pipeline's schemas.
    pub fn step(&self, operation: &str, kind: StepKind) -> Result<TransformStep> {
        let config = self.catalog.require(operation)?;
        Ok(self.bind(kind, &config))
    }

    fn bind(&self, kind: StepKind, operation: &Arc<OperationConfig>) -> TransformStep {
        let step = TransformStep::new(kind, Arc::clone(operation));
        match &self.schemas {
            Some(schemas) => step.with_schemas(Arc::clone(schemas)),
            None => step,
        }
    }

    /// Validate, shape, call upstream and shape the answer.
    pub fn execute(
        &self,
        operation: &str,
        inbound: &InboundRequest,
        upstream: &dyn Upstream,
    ) -> Result<CallerResponse> {
        let config = self.catalog.require(operation)?;
        let span = tracing::debug_span!("execute", operation = %config.name);
        let _guard = span.enter();

        let mut ctx = inbound.seed();

        if self.config.validate_requests && self.schemas.is_some() {
            let report = self.bind(StepKind::ValidateSchema, &config).run(&mut ctx)?;
            if report == StepReport::Validated(false) {
                tracing::info!("request rejected by schema");
                return Ok(CallerResponse::Failure(ErrorEnvelope {
                    status_code: Value::from(SCHEMA_REJECTION_STATUS),
                    status: Value::String(config.failure.status_fallback.clone()),
                    message: Value::String(config.failure.message.clone()),
                }));
            }
        }

        self.bind(StepKind::ShapeRequest, &config).run(&mut ctx)?;
        let request = TransferEnvelope::read_from(&ctx)?;

        let response = upstream.send(&config.name, &request)?;
        tracing::debug!(status_code = ?response.status_code, "upstream answered");
        if let Some(code) = response.status_code {
            ctx.set(vars::RESPONSE_STATUS_CODE, Value::from(code));
        }
        if let Some(body) = &response.body {
            ctx.set(vars::RESPONSE_CONTENT, Value::String(body.clone()));
        }

        let shaped = self.bind(StepKind::ShapeResponse, &config).run(&mut ctx)?;
        match shaped {
            StepReport::Response(ResponseOutcome::Success(body)) => {
                return Ok(CallerResponse::Success(body));
            }
            StepReport::Response(ResponseOutcome::Absent) if response.status_code == Some(200) => {
                // An empty but parseable body is still a success; a missing or
                // unparseable one is a fault.
                if let Some(body) = try_parse(response.body.as_deref()) {
                    return Ok(CallerResponse::Success(body));
                }
            }
            _ => {}
        }

        match self.bind(StepKind::NormalizeFault, &config).run(&mut ctx)? {
            StepReport::Fault(FaultOutcome::Normalized(envelope)) => {
                Ok(CallerResponse::Failure(envelope))
            }
            _ => {
                tracing::warn!("upstream body is already an error envelope, passing through");
                let body = try_parse(response.body.as_deref()).unwrap_or(Value::Null);
                Ok(CallerResponse::Failure(ErrorEnvelope::from_upstream(&body)))
            }
        }
    }
}
