//! Scoped ownership of the single channel to the worker.
//!
//! `SessionConnection` wraps a `Transport` and tracks whether the channel is
//! open. Every exit path releases it: explicit `stop()`/`close()`, a
//! disconnect or failure observed on `recv()`, `dispose()`, and `Drop`.

use tracing::{debug, warn};

use vibeaudit_contracts::{
    error::AuditResult,
    session::AuditParams,
    wire::{ClientCommand, Inbound, StartAnalysis, WorkerMessage},
};

use crate::traits::Transport;

/// Callback invoked once per inbound message, in arrival order.
pub type MessageHandler = Box<dyn FnMut(&WorkerMessage) + Send>;

/// Owns one streaming channel to the worker for the lifetime of a session.
pub struct SessionConnection<T: Transport> {
    transport: T,
    endpoint: String,
    open: bool,
    handler: Option<MessageHandler>,
}

impl<T: Transport> SessionConnection<T> {
    pub fn new(transport: T, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            open: false,
            handler: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open the channel and send the start command.
    ///
    /// On any failure the channel is released before the error is returned.
    pub async fn start(&mut self, params: &AuditParams) -> AuditResult<()> {
        self.transport.open(&self.endpoint).await?;
        self.open = true;
        debug!(endpoint = %self.endpoint, "channel opened");

        let command = ClientCommand::StartAnalysis(StartAnalysis::from(params));
        if let Err(e) = self.transport.send(&command).await {
            self.dispose();
            return Err(e);
        }
        Ok(())
    }

    /// Register the callback invoked for every inbound message.
    ///
    /// Replaces any previously registered handler.
    pub fn on_message(&mut self, handler: impl FnMut(&WorkerMessage) + Send + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Wait for the next inbound frame.
    ///
    /// A closed connection yields `Disconnected` without touching the
    /// transport. Disconnects and failures release the channel.
    pub async fn recv(&mut self) -> Inbound {
        if !self.open {
            return Inbound::Disconnected;
        }

        let inbound = self.transport.recv().await;
        match &inbound {
            Inbound::Message(message) => {
                if let Some(handler) = self.handler.as_mut() {
                    handler(message);
                }
            }
            Inbound::Disconnected | Inbound::Failed(_) => {
                self.open = false;
                self.transport.release();
            }
        }
        inbound
    }

    /// Send the stop command if the channel is open, then close it.
    ///
    /// A second call finds the channel closed and does nothing.
    pub async fn stop(&mut self) {
        if !self.open {
            return;
        }
        if let Err(e) = self.transport.send(&ClientCommand::StopAnalysis).await {
            warn!(error = %e, "failed to deliver stop command");
        }
        self.close().await;
    }

    /// Close the channel gracefully if it is open.
    pub async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.transport.close().await;
            debug!(endpoint = %self.endpoint, "channel closed");
        }
    }

    /// Release the channel unconditionally.
    pub fn dispose(&mut self) {
        self.open = false;
        self.transport.release();
    }
}

impl<T: Transport> Drop for SessionConnection<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
