//! Client configuration schema and loading.
//!
//! Every section and field has a default, so an empty document (or no file
//! at all) yields a usable configuration.
//!
//! ```toml
//! [worker]
//! endpoint = "ws://localhost:5000/ws"
//! idle_timeout_secs = 120
//! connect_timeout_secs = 10
//!
//! [audit]
//! default_max_pages = 3
//!
//! [export]
//! output_dir = "reports"
//! margin_mm = 10.0
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use vibeaudit_contracts::{
    error::{AuditError, AuditResult},
    session::{MAX_PAGES, MIN_PAGES},
};

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:5000/ws";
pub const DEFAULT_MAX_PAGES: u32 = 3;
pub const DEFAULT_MARGIN_MM: f64 = 10.0;

/// Margins wider than this leave no room on an A4 page.
pub const MAX_MARGIN_MM: f64 = 50.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub worker: WorkerConfig,
    pub audit: AuditDefaults,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// WebSocket URL of the audit worker.
    pub endpoint: String,
    /// Fail a running session after this many seconds without a message.
    /// Absent means wait indefinitely.
    pub idle_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            idle_timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditDefaults {
    /// Page budget used when the command line does not give one.
    pub default_max_pages: u32,
}

impl Default for AuditDefaults {
    fn default() -> Self {
        Self {
            default_max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// Page margin on all four sides, in millimetres.
    pub margin_mm: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            margin_mm: DEFAULT_MARGIN_MM,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> AuditResult<Self> {
        let config: ClientConfig = toml::from_str(s).map_err(|e| AuditError::ConfigError {
            reason: format!("failed to parse client config TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuditError::ConfigError {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), endpoint = %config.worker.endpoint, "client config loaded");
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to the defaults.
    pub fn load(path: Option<&Path>) -> AuditResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values no session could run with.
    pub fn validate(&self) -> AuditResult<()> {
        let endpoint = Url::parse(&self.worker.endpoint).map_err(|e| AuditError::ConfigError {
            reason: format!("worker.endpoint '{}' is not a URL: {e}", self.worker.endpoint),
        })?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(AuditError::ConfigError {
                reason: format!(
                    "worker.endpoint must use ws or wss, got '{}'",
                    endpoint.scheme()
                ),
            });
        }

        if self.worker.idle_timeout_secs == Some(0) {
            return Err(AuditError::ConfigError {
                reason: "worker.idle_timeout_secs must be positive".to_string(),
            });
        }
        if self.worker.connect_timeout_secs == Some(0) {
            return Err(AuditError::ConfigError {
                reason: "worker.connect_timeout_secs must be positive".to_string(),
            });
        }

        let pages = self.audit.default_max_pages;
        if !(MIN_PAGES..=MAX_PAGES).contains(&pages) {
            return Err(AuditError::ConfigError {
                reason: format!(
                    "audit.default_max_pages must be between {MIN_PAGES} and {MAX_PAGES}, got {pages}"
                ),
            });
        }

        let margin = self.export.margin_mm;
        if !(0.0..=MAX_MARGIN_MM).contains(&margin) {
            return Err(AuditError::ConfigError {
                reason: format!("export.margin_mm must be between 0 and {MAX_MARGIN_MM}, got {margin}"),
            });
        }

        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.worker.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.worker.connect_timeout_secs.map(Duration::from_secs)
    }
}
