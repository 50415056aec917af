//! Shared types for the Gemini MCP engine: invocation requests and outcomes,
//! the failure taxonomy, progress events, and model constants.

pub mod error;
pub mod models;
pub mod types;

pub use error::{EngineError, FailureKind};
pub use types::{Invocation, InvocationRequest, OutputFormat, ProgressEvent};
