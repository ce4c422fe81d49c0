//! Per-operation transform steps and the request/response pipeline.
//!
//! One generic [`TransformStep`] engine is driven by small
//! [`OperationConfig`] records instead of a script per operation. Steps
//! read and write an explicit [`RequestContext`]; the upstream call is an
//! injected [`Upstream`], so the core never performs I/O itself.

pub mod builtin;
pub mod catalog;
pub mod context;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod pipeline;
pub mod step;

pub use catalog::OperationCatalog;
pub use context::{vars, RequestContext, VariableContext};
pub use envelope::TransferEnvelope;
pub use error::{PipelineError, Result};
pub use operation::OperationConfig;
pub use pipeline::{
    CallerResponse, InboundRequest, Pipeline, PipelineConfig, Upstream, UpstreamResponse,
    SCHEMA_REJECTION_STATUS,
};
pub use step::{StepKind, StepReport, TransformStep};
