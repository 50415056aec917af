//! Model identifiers and Gemini CLI vocabulary.

/// Default model when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Lighter-weight model used after a quota failure on the primary.
pub const FALLBACK_MODEL: &str = "gemini-3-flash-preview";

/// Stable (non-preview) aliases accepted as overrides.
pub const PRO_STABLE: &str = "gemini-2.5-pro";
pub const FLASH_STABLE: &str = "gemini-2.5-flash";

/// Substring the Gemini CLI prints when the requested model is out of quota.
/// The CLI exposes no structured error code, so detection is textual.
pub const QUOTA_EXCEEDED_SIGNATURE: &str = "Quota exceeded for quota metric";

/// Status texts surfaced to callers through the progress channel.
pub mod status {
    pub const STARTING: &str = "Starting Gemini analysis (may take several minutes for large codebases)";
    pub const STILL_PROCESSING: &str = "Still processing... Gemini is working on your request";
    pub const QUOTA_SWITCHING: &str = "Model quota exceeded, switching to Flash model...";
    pub const FLASH_RETRY: &str = "Retrying with Flash model...";
    pub const FLASH_SUCCESS: &str = "Flash model completed successfully";
    pub const SANDBOX_EXECUTING: &str = "Executing Gemini CLI command in sandbox mode...";
}
