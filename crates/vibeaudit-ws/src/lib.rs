//! # vibeaudit-ws
//!
//! WebSocket implementation of [`Transport`](vibeaudit_core::traits::Transport).
//!
//! One text frame carries one JSON message. Binary frames are decoded as
//! UTF-8 text; ping/pong frames are skipped. A close frame or the end of the
//! stream is a disconnect; a protocol or I/O error after open is a
//! `ConnectionError`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use vibeaudit_contracts::{
    error::{AuditError, AuditResult},
    wire::{ClientCommand, Inbound},
};
use vibeaudit_core::traits::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A `Transport` over a single WebSocket connection.
#[derive(Default)]
pub struct WsTransport {
    stream: Option<WsStream>,
    connect_timeout: Option<Duration>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on the opening handshake after `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&mut self, endpoint: &str) -> AuditResult<()> {
        let connect = connect_async(endpoint);
        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                AuditError::ConnectionError {
                    reason: format!(
                        "timed out connecting to {endpoint} after {}s",
                        limit.as_secs()
                    ),
                }
            })?,
            None => connect.await,
        };

        let (stream, response) = result.map_err(|e| AuditError::ConnectionError {
            reason: format!("failed to connect to {endpoint}: {e}"),
        })?;

        debug!(endpoint, status = %response.status(), "websocket connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, command: &ClientCommand) -> AuditResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(AuditError::ConnectionError {
                reason: "channel is not open".to_string(),
            });
        };

        let text = serde_json::to_string(command).map_err(|e| AuditError::PayloadDecode {
            reason: format!("failed to encode command: {e}"),
        })?;

        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| AuditError::ConnectionError {
                reason: format!("failed to send command: {e}"),
            })
    }

    async fn recv(&mut self) -> Inbound {
        let Some(stream) = self.stream.as_mut() else {
            return Inbound::Disconnected;
        };

        let inbound = next_inbound(stream).await;
        if matches!(
            inbound,
            Inbound::Disconnected | Inbound::Failed(AuditError::ConnectionError { .. })
        ) {
            self.stream = None;
        }
        inbound
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!(error = %e, "websocket close handshake failed");
            }
        }
    }

    fn release(&mut self) {
        self.stream = None;
    }
}

async fn next_inbound(stream: &mut WsStream) -> Inbound {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Inbound::from_frame(&text),
            Some(Ok(Message::Binary(bytes))) => {
                return Inbound::from_frame(&String::from_utf8_lossy(&bytes))
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "worker closed the channel");
                return Inbound::Disconnected;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "websocket receive failed");
                return Inbound::Failed(AuditError::ConnectionError {
                    reason: format!("connection dropped: {e}"),
                });
            }
            None => return Inbound::Disconnected,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::{accept_async, tungstenite::Message};

    use vibeaudit_contracts::{
        error::AuditError,
        session::AuditParams,
        wire::{ClientCommand, Inbound, WorkerMessage},
    };
    use vibeaudit_core::{traits::Transport, SessionConnection};

    use super::WsTransport;

    /// Spawn a loopback worker that reads one command, replies with `frames`,
    /// then closes. Returns the endpoint and a handle yielding the command.
    async fn fake_worker(frames: Vec<&'static str>) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let first = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("expected a text command, got {:?}", other),
            };
            for frame in frames {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            ws.close(None).await.unwrap();
            first
        });

        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_round_trip_with_worker() {
        let (endpoint, worker) = fake_worker(vec![
            r#"{"event":"log","data":{"message":"Analyzing Page 1/1","type":"progress"}}"#,
            r#"{"event":"complete","data":{"status":"success","data":{"base_domain":"example.com","results":[]}}}"#,
        ])
        .await;

        let params = AuditParams::new("https://example.com", 1, None).unwrap();
        let mut connection = SessionConnection::new(WsTransport::new(), endpoint);
        connection.start(&params).await.unwrap();

        match connection.recv().await {
            Inbound::Message(WorkerMessage::Log(log)) => {
                assert_eq!(log.kind.as_deref(), Some("progress"));
            }
            other => panic!("expected log, got {:?}", other),
        }
        match connection.recv().await {
            Inbound::Message(WorkerMessage::Complete(c)) => {
                assert_eq!(c.data.base_domain, "example.com");
            }
            other => panic!("expected complete, got {:?}", other),
        }
        assert_eq!(connection.recv().await, Inbound::Disconnected);
        assert!(!connection.is_open());

        let command: ClientCommand = serde_json::from_str(&worker.await.unwrap()).unwrap();
        assert!(matches!(command, ClientCommand::StartAnalysis(s) if s.max_pages == 1));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        // Bind then drop to obtain a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = WsTransport::new();
        let err = transport.open(&format!("ws://{addr}")).await.unwrap_err();
        assert!(matches!(err, AuditError::ConnectionError { .. }));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let mut transport = WsTransport::new();
        let err = transport.send(&ClientCommand::StopAnalysis).await.unwrap_err();
        assert!(matches!(err, AuditError::ConnectionError { .. }));
        assert_eq!(transport.recv().await, Inbound::Disconnected);
    }
}
