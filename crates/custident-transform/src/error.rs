/// Errors raised while building selectors or projecting documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A declarative selector could not be parsed.
    #[error("invalid selector at {path}: {reason}")]
    InvalidSelector { path: String, reason: String },

    /// The source document does not have the shape the selector assumes.
    ///
    /// This is a contract violation between the operation config and the
    /// upstream, and is propagated rather than absorbed.
    #[error("structural mismatch at {path}: expected {expected}, found {found}")]
    StructuralMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, TransformError>;
