//! The channel seam between the session monitor and the remote worker.
//!
//! `Transport` is the only I/O boundary in the core. The WebSocket
//! implementation lives in `vibeaudit-ws`; tests drive the controller with
//! scripted in-memory transports.

use async_trait::async_trait;

use vibeaudit_contracts::{
    error::AuditResult,
    wire::{ClientCommand, Inbound},
};

/// A bidirectional, ordered message channel to the audit worker.
///
/// Implementations deliver inbound frames strictly in arrival order and
/// never batch or reorder them.
#[async_trait]
pub trait Transport: Send {
    /// Open the channel to `endpoint`.
    ///
    /// Refusal or failure returns `AuditError::ConnectionError`. Callers do
    /// not retry.
    async fn open(&mut self, endpoint: &str) -> AuditResult<()>;

    /// Send one command frame.
    async fn send(&mut self, command: &ClientCommand) -> AuditResult<()>;

    /// Wait for the next inbound frame.
    ///
    /// Returns `Inbound::Disconnected` once the worker has closed the
    /// channel; every later call keeps returning it.
    async fn recv(&mut self) -> Inbound;

    /// Close the channel gracefully (close handshake where the protocol
    /// has one).
    async fn close(&mut self);

    /// Drop the underlying connection immediately, without awaiting.
    ///
    /// Used on teardown paths that cannot await, such as `Drop`.
    fn release(&mut self);
}
