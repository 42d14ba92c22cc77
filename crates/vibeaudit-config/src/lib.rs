//! # vibeaudit-config
//!
//! TOML configuration for the VibeAudit client: where the worker lives, how
//! long to wait on it, the default page budget, and export settings.
//!
//! ```rust,ignore
//! use std::path::Path;
//! use vibeaudit_config::ClientConfig;
//!
//! let config = ClientConfig::load(Some(Path::new("vibeaudit.toml")))?;
//! let idle = config.idle_timeout();
//! ```
//!
//! Command-line flags override file values; the binary applies them after
//! loading.

pub mod config;

pub use config::{AuditDefaults, ClientConfig, ExportConfig, WorkerConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────
