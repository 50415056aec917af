use serde::Serialize;

/// Wire-visible failure classification.
///
/// Every [`EngineError`] maps onto one of these; the serialized names are what
/// tool callers see in failure payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    InvalidInput,
    QuotaExceeded,
    ProcessError,
    Timeout,
    NotFound,
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Quota exceeded for model '{model}': {message}")]
    QuotaExceeded { model: String, message: String },

    #[error("Gemini CLI execution failed: {0}")]
    Process(String),

    #[error("Invocation timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    #[error("Invocation cancelled by caller")]
    Cancelled,

    #[error(
        "No cached chunks under key '{0}' (expired or never created); re-run the original request"
    )]
    NotFound(String),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::QuotaExceeded { .. } => FailureKind::QuotaExceeded,
            // A cancelled invocation never produces a response; if the error
            // must serialize anyway, process-error is the closest class.
            Self::Process(_) | Self::Cancelled => FailureKind::ProcessError,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NotFound(_) => FailureKind::NotFound,
        }
    }
}
