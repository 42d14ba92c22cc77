//! Error types for the VibeAudit client.
//!
//! All fallible operations return `AuditResult<T>`. Variants are `Clone` so a
//! terminal error can be stored as a session outcome and shown to the user.

use thiserror::Error;

/// The unified error type for the VibeAudit client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The channel to the worker failed to open or dropped unexpectedly.
    #[error("connection error: {reason}")]
    ConnectionError { reason: String },

    /// The worker sent an explicit error message.
    #[error("worker reported error: {message}")]
    WorkerReportedError { message: String },

    /// The user asked for the session to stop and confirmed it.
    #[error("audit cancelled by user")]
    UserCancelled,

    /// A session was requested without the parameters needed to start it.
    ///
    /// Callers route this back to configuration; it is not a runtime failure.
    #[error("missing session parameters: {}", missing.join(", "))]
    MissingSessionParameters { missing: Vec<String> },

    /// Parameters were present but out of range or malformed.
    #[error("invalid audit parameters: {reason}")]
    InvalidParameters { reason: String },

    /// `start()` was called while a session was already live.
    #[error("session already {state}; only an idle session can start")]
    SessionBusy { state: String },

    /// The worker sent nothing for longer than the configured idle timeout.
    #[error("no message from worker for {secs}s")]
    IdleTimeout { secs: u64 },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The report could not be rendered or written.
    #[error("export failed: {reason}")]
    ExportFailed { reason: String },

    /// A stored or received payload could not be decoded.
    #[error("payload decode error: {reason}")]
    PayloadDecode { reason: String },
}

/// Convenience alias used throughout the VibeAudit crates.
pub type AuditResult<T> = Result<T, AuditError>;
