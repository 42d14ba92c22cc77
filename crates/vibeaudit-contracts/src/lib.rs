//! # vibeaudit-contracts
//!
//! Shared types, wire messages, and errors for the VibeAudit client.
//!
//! All crates in the workspace import from here. No session or report logic
//! lives in this crate: only data definitions, validation, and frame decoding.

pub mod error;
pub mod payload;
pub mod session;
pub mod wire;
