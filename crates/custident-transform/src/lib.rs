//! Field projection and response normalization for customer-identity payloads.
//!
//! This is the decision layer of custident:
//! - [`Selector`] declares which fields survive a hop, with optional renaming
//!   and element-wise mapping over arrays
//! - [`project`] applies a selector to a parsed document
//! - [`shape_response`] and [`normalize_fault`] classify an upstream response
//!   and produce either a projected body or the uniform error envelope
//!
//! Nothing here performs I/O or keeps state between calls.

pub mod body;
pub mod error;
pub mod normalize;
pub mod project;
pub mod selector;

pub use body::{is_truthy, try_parse};
pub use error::{Result, TransformError};
pub use normalize::{
    normalize_fault, shape_response, ErrorEnvelope, FailurePolicy, FaultOutcome,
    ResponseOutcome, StatusCodeSource, StatusOutcome, GENERAL_ERROR_MESSAGE,
    STATUS_FAIL, STATUS_FAILED, STATUS_INVALID_RESPONSE_FORMAT,
};
pub use project::project;
pub use selector::{FieldKind, FieldRule, Selector};
