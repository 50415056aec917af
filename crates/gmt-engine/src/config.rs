//! Engine configuration: TOML file with serde defaults, plus `GMT_*`
//! environment overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use gmt_core::models;
use serde::Deserialize;

pub const HEARTBEAT_SECS_ENV: &str = "GMT_HEARTBEAT_SECS";
pub const GEMINI_BIN_ENV: &str = "GMT_GEMINI_BIN";
pub const DEFAULT_MODEL_ENV: &str = "GMT_DEFAULT_MODEL";
pub const FALLBACK_MODEL_ENV: &str = "GMT_FALLBACK_MODEL";
pub const MAX_CONCURRENT_ENV: &str = "GMT_MAX_CONCURRENT";

const DEFAULT_HEARTBEAT_SECS: u64 = 25;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable name or path for the Gemini CLI.
    pub executable: String,
    pub default_model: String,
    pub fallback_model: String,
    /// Heartbeat interval in seconds; 0 disables the heartbeat.
    pub heartbeat_secs: u64,
    /// Optional bound on concurrently running child processes.
    pub max_concurrent: Option<usize>,
    pub chunk: ChunkConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub max_chars: usize,
    /// Cached chunk sequences age out after this many seconds.
    pub ttl_secs: u64,
    /// Capacity bound on cached sequences (oldest evicted first).
    pub max_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: "gemini".to_string(),
            default_model: models::DEFAULT_MODEL.to_string(),
            fallback_model: models::FALLBACK_MODEL.to_string(),
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
            max_concurrent: None,
            chunk: ChunkConfig::default(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 50_000,
            ttl_secs: 600,
            max_entries: 32,
        }
    }
}

impl EngineConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("failed to parse config: {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(GEMINI_BIN_ENV) {
            if !value.trim().is_empty() {
                self.executable = value;
            }
        }
        if let Ok(value) = std::env::var(DEFAULT_MODEL_ENV) {
            if !value.trim().is_empty() {
                self.default_model = value;
            }
        }
        if let Ok(value) = std::env::var(FALLBACK_MODEL_ENV) {
            if !value.trim().is_empty() {
                self.fallback_model = value;
            }
        }
        if let Ok(value) = std::env::var(HEARTBEAT_SECS_ENV) {
            if let Ok(secs) = value.trim().parse::<u64>() {
                self.heartbeat_secs = secs;
            }
        }
        if let Ok(value) = std::env::var(MAX_CONCURRENT_ENV) {
            if let Ok(parsed) = value.trim().parse::<usize>() {
                self.max_concurrent = (parsed > 0).then_some(parsed);
            }
        }
    }

    /// Heartbeat interval; `None` when disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_secs > 0).then(|| Duration::from_secs(self.heartbeat_secs))
    }

    pub fn chunk_ttl(&self) -> Duration {
        Duration::from_secs(self.chunk.ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.executable, "gemini");
        assert_eq!(config.default_model, models::DEFAULT_MODEL);
        assert_eq!(config.fallback_model, models::FALLBACK_MODEL);
        assert_eq!(
            config.heartbeat_interval(),
            Some(Duration::from_secs(DEFAULT_HEARTBEAT_SECS))
        );
        assert!(config.max_concurrent.is_none());
        assert_eq!(config.chunk.max_chars, 50_000);
    }

    #[test]
    fn test_zero_heartbeat_disables_interval() {
        let config = EngineConfig {
            heartbeat_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.heartbeat_interval(), None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_model = \"gemini-2.5-pro\"\n\n[chunk]\nmax_chars = 1000"
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.default_model, "gemini-2.5-pro");
        assert_eq!(config.chunk.max_chars, 1000);
        // Untouched fields keep their defaults.
        assert_eq!(config.fallback_model, models::FALLBACK_MODEL);
        assert_eq!(config.chunk.max_entries, 32);
    }

    #[test]
    fn test_unknown_toml_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "no_such_key = true").unwrap();
        assert!(EngineConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/gmt.toml");
        assert!(EngineConfig::load(Some(missing)).is_err());
    }
}
