/// Errors that can occur while loading schemas or gating a payload.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),

    /// The payload does not conform to the operation's schema.
    #[error("validation failed for operation {operation}: {message}")]
    ValidationFailed { operation: String, message: String },

    /// The payload or schema text is not valid JSON.
    #[error("document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No schema registered for the given operation.
    #[error("no schema registered for operation {0}")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
