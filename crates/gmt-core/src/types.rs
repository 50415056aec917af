use std::time::Duration;

use serde::Serialize;

use crate::error::EngineError;

/// Output format selector passed to the Gemini CLI via `--output-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Default human-readable text.
    #[default]
    Text,
    /// Single structured JSON response.
    Json,
    /// JSONL events, parsed incrementally and aggregated before returning.
    StreamJson,
}

impl OutputFormat {
    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::StreamJson => "stream-json",
        }
    }
}

/// One end-to-end execution request for the external CLI.
///
/// Constructed per call, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Fully-formed instruction text (prompt assembly happens in the tool layer).
    pub prompt: String,
    /// Model override; `None` means the process-wide default.
    pub model: Option<String>,
    /// Run the CLI in sandbox mode (`-s`).
    pub sandbox: bool,
    /// Structured-edit mode: output is destined for chunked edit suggestions.
    pub change_mode: bool,
    pub output_format: OutputFormat,
    /// Optional caller-supplied deadline. The engine itself never imposes one;
    /// long invocations are expected and liveness comes from progress events.
    pub timeout: Option<Duration>,
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            sandbox: false,
            change_mode: false,
            output_format: OutputFormat::default(),
            timeout: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_change_mode(mut self, change_mode: bool) -> Self {
        self.change_mode = change_mode;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject malformed requests before any process is spawned.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.prompt.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "Please provide a prompt for analysis. Use @ syntax to include files \
                 (e.g., '@largefile.js explain what this does') or ask general questions"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Successful invocation outcome.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Aggregated CLI output.
    pub text: String,
    /// Model that actually produced the result.
    pub model: String,
    /// True when the result came from the quota-fallback retry.
    pub used_fallback: bool,
}

/// Advisory liveness event emitted while an invocation is in flight.
///
/// Never persisted; delivery is best-effort and must not affect the
/// invocation itself.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Strictly increasing per invocation, starting at 0.
    pub sequence: u64,
    /// Milliseconds since the invocation started.
    pub elapsed_ms: u64,
    pub message: String,
}
