//! JSON Schema gate for inbound customer-identity payloads.
//!
//! A payload is checked against the operation's declarative schema before
//! it is allowed to proceed to request shaping. Callers only need the
//! boolean verdict; the first violated constraint is kept for logging.

pub mod config;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
pub use validator::{first_violation, validate};
