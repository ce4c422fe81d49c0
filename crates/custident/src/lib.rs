//! Transform-and-validate pipeline for a customer-identity API gateway.
//!
//! Inbound payloads are gated by JSON Schema, trimmed to a declared field
//! set before they go upstream, and upstream answers are either projected
//! for the caller or folded into one `{ statusCode, status, message }`
//! error envelope.
//!
//! # Crate Structure
//!
//! - [`transform`]: field selectors, projection and response normalization
//! - [`schema`]: JSON Schema registry and validation (behind `schema` feature)
//! - [`pipeline`]: per-operation steps, catalog and request pipeline
//!   (behind `pipeline` feature)

/// Re-export transform types.
pub mod transform {
    pub use custident_transform::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use custident_schema::*;
}

/// Re-export pipeline types (requires `pipeline` feature).
#[cfg(feature = "pipeline")]
pub mod pipeline {
    pub use custident_pipeline::*;
}
