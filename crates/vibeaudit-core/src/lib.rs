//! # vibeaudit-core
//!
//! The live audit session monitor.
//!
//! This crate provides:
//! - The `Transport` trait, the only I/O seam to the remote worker
//! - `SessionConnection`, which owns the channel and releases it on every exit
//! - `Timeline` and `classify`, the ordered, classified event record
//! - `estimate`, the completion percentage
//! - `SessionController`, the lifecycle state machine composing the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vibeaudit_core::SessionController;
//!
//! let mut controller = SessionController::new(transport, "ws://localhost:5000/ws");
//! controller.start(params).await?;
//! while !controller.pump(None).await.is_terminal() {
//!     render(controller.view());
//! }
//! ```

pub mod connection;
pub mod controller;
pub mod progress;
pub mod timeline;
pub mod traits;

pub use connection::SessionConnection;
pub use controller::{AuditSession, SessionController, SessionView};
pub use progress::estimate;
pub use timeline::{classify, Timeline};

// ── Tests ─────────────────────────────────────────────────────────────────────
