//! The `run` subcommand: one live audit session on the terminal.
//!
//! Ctrl-C once asks to stop; a second Ctrl-C confirms. Worker frames keep
//! flowing in between, and a completion that arrives first wins.

use std::{fs::File, io::Write, path::Path, time::Duration};

use serde::Serialize;
use tokio::{
    sync::mpsc,
    time::{timeout_at, Instant},
};
use tracing::{info, warn};

use vibeaudit_contracts::{
    error::{AuditError, AuditResult},
    payload::FinalPayload,
    session::AuditParams,
    wire::{Inbound, WorkerMessage},
};
use vibeaudit_core::{traits::Transport, SessionController};
use vibeaudit_ws::WsTransport;

use crate::{export_payload, load_config, output, RunArgs};

/// What woke the session loop.
enum Wake {
    Frame(Inbound),
    Idle(Duration),
    Interrupt,
}

pub async fn run(args: RunArgs) -> AuditResult<()> {
    let config = load_config(args.config.as_deref())?;
    let params = AuditParams::from_parts(
        args.url.as_deref(),
        args.max_pages.or(Some(config.audit.default_max_pages)),
        args.intent.as_deref(),
    )?;

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.worker.endpoint.clone());
    let idle = args
        .idle_timeout
        .map(Duration::from_secs)
        .or_else(|| config.idle_timeout());

    let mut transport = WsTransport::new();
    if let Some(limit) = config.connect_timeout() {
        transport = transport.with_connect_timeout(limit);
    }

    let mut controller = SessionController::new(transport, endpoint);
    if let Some(path) = &args.transcript {
        controller.on_message(transcript(path)?);
    }

    println!(
        "Auditing {} ({} page{})",
        params.url(),
        params.max_pages(),
        if params.max_pages() == 1 { "" } else { "s" }
    );

    let mut printed = 0;
    let started = controller.start(params).await;
    printed = output::print_events(&controller.view(), printed);
    started?;

    let mut interrupts = interrupts();
    drive(&mut controller, idle, &mut printed, &mut interrupts).await;

    let outcome = controller
        .outcome()
        .ok_or_else(|| AuditError::ConnectionError {
            reason: "session ended without an outcome".to_string(),
        })?;
    let result = match outcome.result() {
        Ok(payload) => {
            if let Some(path) = &args.payload_out {
                save_payload(path, payload)?;
            }
            export_payload(payload, &config, args.out_dir.as_deref()).map(|_| ())
        }
        Err(AuditError::UserCancelled) => {
            println!("Audit stopped.");
            Ok(())
        }
        Err(error) => Err(error),
    };

    controller.dispose();
    result
}

/// Forward every Ctrl-C to a channel. The listener outlives each loop
/// iteration, so an interrupt that lands while events are printing is queued.
fn interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Process frames and interrupts until the session reaches a terminal state.
async fn drive<T: Transport>(
    controller: &mut SessionController<T>,
    idle: Option<Duration>,
    printed: &mut usize,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) {
    let mut last_frame = Instant::now();

    while !controller.state().is_terminal() {
        let wake = tokio::select! {
            inbound = next_frame(controller, idle, last_frame) => inbound,
            Some(()) = interrupts.recv() => Wake::Interrupt,
        };

        match wake {
            Wake::Frame(inbound) => {
                last_frame = Instant::now();
                controller.handle(inbound).await;
            }
            Wake::Idle(limit) => controller.expire_idle(limit).await,
            Wake::Interrupt if controller.is_stop_pending() => {
                controller.confirm_stop().await;
            }
            Wake::Interrupt => {
                if controller.request_stop() {
                    eprintln!("Stop requested. Press Ctrl-C again to stop the audit.");
                }
            }
        }

        *printed = output::print_events(&controller.view(), *printed);
    }
}

/// Wait for the next frame, giving up when the worker has been silent for
/// `idle` since `last_frame`. Dropping this future loses no frame.
async fn next_frame<T: Transport>(
    controller: &mut SessionController<T>,
    idle: Option<Duration>,
    last_frame: Instant,
) -> Wake {
    match idle {
        Some(limit) => match timeout_at(last_frame + limit, controller.recv()).await {
            Ok(inbound) => Wake::Frame(inbound),
            Err(_) => Wake::Idle(limit),
        },
        None => Wake::Frame(controller.recv().await),
    }
}

#[derive(Serialize)]
struct TranscriptLine<'a> {
    at: String,
    message: &'a WorkerMessage,
}

/// A message handler appending every worker message to `path` as JSON Lines.
fn transcript(path: &Path) -> AuditResult<impl FnMut(&WorkerMessage) + Send + 'static> {
    let mut file = File::create(path).map_err(|e| AuditError::ConfigError {
        reason: format!("failed to create transcript '{}': {e}", path.display()),
    })?;
    info!(path = %path.display(), "recording transcript");

    Ok(move |message: &WorkerMessage| {
        let line = TranscriptLine {
            at: chrono::Utc::now().to_rfc3339(),
            message,
        };
        let written = serde_json::to_string(&line)
            .map_err(std::io::Error::other)
            .and_then(|json| writeln!(file, "{json}"));
        if let Err(e) = written {
            warn!(error = %e, "failed to append to transcript");
        }
    })
}

fn save_payload(path: &Path, payload: &FinalPayload) -> AuditResult<()> {
    let json = serde_json::to_vec_pretty(payload).map_err(|e| AuditError::ExportFailed {
        reason: format!("failed to encode payload: {e}"),
    })?;
    std::fs::write(path, json).map_err(|e| AuditError::ExportFailed {
        reason: format!("failed to write payload '{}': {e}", path.display()),
    })?;
    println!("Payload: {}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use vibeaudit_contracts::{
        session::{AuditParams, SessionOutcome, SessionState},
        wire::ClientCommand,
    };

    use super::*;

    /// A worker that accepts the session and then never says anything.
    #[derive(Default)]
    struct SilentTransport {
        sent: Arc<Mutex<Vec<ClientCommand>>>,
    }

    #[async_trait]
    impl Transport for SilentTransport {
        async fn open(&mut self, _endpoint: &str) -> AuditResult<()> {
            Ok(())
        }

        async fn send(&mut self, command: &ClientCommand) -> AuditResult<()> {
            self.sent.lock().unwrap().push(command.clone());
            Ok(())
        }

        async fn recv(&mut self) -> Inbound {
            std::future::pending().await
        }

        async fn close(&mut self) {}

        fn release(&mut self) {}
    }

    async fn running() -> (SessionController<SilentTransport>, Arc<Mutex<Vec<ClientCommand>>>) {
        let transport = SilentTransport::default();
        let sent = transport.sent.clone();
        let mut controller = SessionController::new(transport, "ws://worker");
        let params = AuditParams::new("https://example.com", 1, None).unwrap();
        controller.start(params).await.unwrap();
        (controller, sent)
    }

    #[tokio::test]
    async fn queued_interrupts_stop_the_session() {
        let (mut controller, sent) = running().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();
        tx.send(()).unwrap();

        let mut printed = 0;
        drive(&mut controller, None, &mut printed, &mut rx).await;

        assert_eq!(controller.state(), SessionState::Stopped);
        let stops = sent
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, ClientCommand::StopAnalysis))
            .count();
        assert_eq!(stops, 1);
    }

    #[tokio::test]
    async fn silent_worker_errors_after_idle_limit() {
        let (mut controller, _sent) = running().await;
        let (_tx, mut rx) = mpsc::unbounded_channel();

        let mut printed = 0;
        drive(&mut controller, Some(Duration::from_millis(20)), &mut printed, &mut rx).await;

        assert_eq!(controller.state(), SessionState::Errored);
        assert!(matches!(
            controller.outcome(),
            Some(SessionOutcome::Errored(AuditError::IdleTimeout { .. }))
        ));
    }
}
