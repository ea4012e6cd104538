//! Layered settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`gpuwatch.toml` unless `--config` says otherwise)
//! 3. environment variables prefixed `GPUWATCH_` (e.g. `GPUWATCH_API_URL`)
//! 4. command-line flags, applied by the binary afterwards
//!
//! ```toml
//! api_url = "http://gpu-box:8000"
//! refresh_ms = 2000
//! history_capacity = 30
//! evict_after_missed = 3
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::{RetentionPolicy, DEFAULT_CAPACITY};
use crate::poll::{PollConfig, DEFAULT_TIMESTAMP_FORMAT};
use crate::source::DEFAULT_BASE_URL;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gpuwatch.toml";

const ENV_PREFIX: &str = "GPUWATCH";

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Device service base URL.
    pub api_url: String,
    /// Bearer token; requests are unauthenticated without one.
    #[serde(default)]
    pub token: Option<String>,
    /// Poll interval in milliseconds.
    pub refresh_ms: u64,
    /// Points kept per series.
    pub history_capacity: usize,
    /// Evict devices absent for this many consecutive polls; unset retains all.
    #[serde(default)]
    pub evict_after_missed: Option<u32>,
    /// Forwarded to the optimal-device query as `min_memory_mb`.
    #[serde(default)]
    pub min_free_memory_mb: Option<u64>,
    pub request_timeout_ms: u64,
    /// chrono format for series labels.
    pub timestamp_format: String,
    /// Tracing output file. No logging without one.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            refresh_ms: 5000,
            history_capacity: DEFAULT_CAPACITY,
            evict_after_missed: None,
            min_free_memory_mb: None,
            request_timeout_ms: 10_000,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            log_file: None,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    ///
    /// With `path = None` the default file is used if it exists. An explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = Settings::default();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("refresh_ms", defaults.refresh_ms)?
            .set_default("history_capacity", defaults.history_capacity as u64)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("timestamp_format", defaults.timestamp_format)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_ms == 0 {
            bail!("refresh_ms must be positive");
        }
        if self.history_capacity == 0 {
            bail!("history_capacity must be positive");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be positive");
        }
        if self.evict_after_missed == Some(0) {
            bail!("evict_after_missed must be at least 1");
        }
        Ok(())
    }

    pub fn poll_config(&self) -> Result<PollConfig> {
        Ok(PollConfig::from_millis(self.refresh_ms)?)
    }

    pub fn retention(&self) -> RetentionPolicy {
        match self.evict_after_missed {
            Some(n) => RetentionPolicy::EvictAfterMissed(n),
            None => RetentionPolicy::RetainAll,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load_from(None, Some(HashMap::new())).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retention(), RetentionPolicy::RetainAll);
        assert_eq!(settings.poll_config().unwrap().interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
            api_url = "http://gpu-box:8000"
            refresh_ms = 2000
            evict_after_missed = 3
            token = "secret"
            "#,
        );

        let settings = Settings::load_from(Some(file.path()), Some(HashMap::new())).unwrap();
        assert_eq!(settings.api_url, "http://gpu-box:8000");
        assert_eq!(settings.refresh_ms, 2000);
        assert_eq!(settings.token.as_deref(), Some("secret"));
        assert_eq!(settings.retention(), RetentionPolicy::EvictAfterMissed(3));
        assert_eq!(settings.history_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("refresh_ms = 2000\n");
        let env = HashMap::from([
            ("GPUWATCH_REFRESH_MS".to_string(), "10000".to_string()),
            ("GPUWATCH_MIN_FREE_MEMORY_MB".to_string(), "4096".to_string()),
        ]);

        let settings = Settings::load_from(Some(file.path()), Some(env)).unwrap();
        assert_eq!(settings.refresh_ms, 10_000);
        assert_eq!(settings.min_free_memory_mb, Some(4096));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load_from(
            Some(Path::new("/nonexistent/gpuwatch.toml")),
            Some(HashMap::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = toml_file("refresh_ms = 0\n");
        let err = Settings::load_from(Some(file.path()), Some(HashMap::new())).unwrap_err();
        assert!(err.to_string().contains("refresh_ms"));
    }
}
