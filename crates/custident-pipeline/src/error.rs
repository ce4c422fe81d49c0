use custident_schema::SchemaError;
use custident_transform::TransformError;

/// Errors that can occur while running transform steps.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Projection or selector error from the transform layer.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Schema registry error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A variable the step depends on was never set.
    #[error("missing context variable {0}")]
    MissingVariable(&'static str),

    /// The inbound request content is not JSON.
    #[error("request content is not valid JSON: {0}")]
    InvalidContent(#[source] serde_json::Error),

    /// No operation with this name in the catalog.
    #[error("unknown operation {0}")]
    UnknownOperation(String),

    /// The operation catalog could not be loaded.
    #[error("invalid operation catalog: {0}")]
    InvalidCatalog(String),

    /// The upstream collaborator failed before producing a response.
    #[error("upstream call failed: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
