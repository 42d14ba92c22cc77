//! The session controller: the lifecycle state machine of one audit.
//!
//! ```text
//!   Idle ──start()──► Connecting ──opened──► Running ──complete──► Completed
//!                         │                     │
//!                         └──conn error──► Errored ◄──error / disconnect / idle timeout
//!                                               │
//!                         Running ──request_stop() + confirm_stop()──► Stopped
//! ```
//!
//! Side effects belong to the transitions: `start()` opens the channel and
//! sends exactly one start command, `confirm_stop()` sends at most one stop
//! command, and every terminal transition closes the channel.

use std::time::Duration;

use tracing::{debug, info, warn};

use vibeaudit_contracts::{
    error::{AuditError, AuditResult},
    payload::FinalPayload,
    session::{AuditParams, LogEvent, LogKind, SessionId, SessionOutcome, SessionState},
    wire::{Inbound, WorkerMessage},
};

use crate::{
    connection::SessionConnection,
    progress::estimate,
    timeline::{classify, Timeline},
    traits::Transport,
};

/// Message appended to the timeline when the user stops a session.
pub const STOPPED_MESSAGE: &str = "Audit stopped by user";

/// Everything one audit session accumulates.
#[derive(Debug, Clone)]
pub struct AuditSession {
    pub id: SessionId,
    /// Absent until `start()` is called.
    pub params: Option<AuditParams>,
    pub state: SessionState,
    pub timeline: Timeline,
    /// Set exactly once, on the transition into a terminal state.
    pub outcome: Option<SessionOutcome>,
}

impl AuditSession {
    fn new() -> Self {
        Self {
            id: SessionId::new(),
            params: None,
            state: SessionState::Idle,
            timeline: Timeline::new(),
            outcome: None,
        }
    }
}

/// A read-only snapshot for the live view.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub state: SessionState,
    /// Rendered events only; dividers are filtered out.
    pub events: Vec<LogEvent>,
    pub pages_started: usize,
    pub pages_completed: usize,
    pub max_pages: u32,
    pub percent: f64,
    pub stop_pending: bool,
}

/// Drives one audit session over one owned channel.
///
/// Only one session is live per controller. Call `reset()` after a terminal
/// state to start over.
pub struct SessionController<T: Transport> {
    connection: SessionConnection<T>,
    session: AuditSession,
    stop_pending: bool,
}

impl<T: Transport> SessionController<T> {
    pub fn new(transport: T, endpoint: impl Into<String>) -> Self {
        Self {
            connection: SessionConnection::new(transport, endpoint),
            session: AuditSession::new(),
            stop_pending: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn session(&self) -> &AuditSession {
        &self.session
    }

    pub fn timeline(&self) -> &Timeline {
        &self.session.timeline
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.session.outcome.as_ref()
    }

    pub fn is_stop_pending(&self) -> bool {
        self.stop_pending
    }

    /// The worker's final payload, once the session has completed.
    pub fn payload(&self) -> Option<&FinalPayload> {
        match &self.session.outcome {
            Some(SessionOutcome::Completed(payload)) => Some(payload.as_ref()),
            _ => None,
        }
    }

    /// Completion estimate in `[0, 100]`. A completed session reports 100.
    pub fn progress(&self) -> f64 {
        if self.session.state == SessionState::Completed {
            return 100.0;
        }
        self.session
            .params
            .as_ref()
            .map_or(0.0, |p| estimate(&self.session.timeline, p.max_pages()))
    }

    pub fn view(&self) -> SessionView {
        let timeline = &self.session.timeline;
        SessionView {
            state: self.session.state,
            events: timeline.rendered().cloned().collect(),
            pages_started: timeline.pages_started(),
            pages_completed: timeline.pages_completed(),
            max_pages: self.session.params.as_ref().map_or(0, AuditParams::max_pages),
            percent: self.progress(),
            stop_pending: self.stop_pending,
        }
    }

    /// Register a callback that sees every inbound message before it is
    /// classified.
    pub fn on_message(&mut self, handler: impl FnMut(&WorkerMessage) + Send + 'static) {
        self.connection.on_message(handler);
    }

    /// `Idle → Connecting → Running`.
    ///
    /// Rejects the call with `SessionBusy` unless the session is idle. A
    /// connection failure appends one error event, moves to `Errored`, and
    /// is returned to the caller as well. There is no retry.
    pub async fn start(&mut self, params: AuditParams) -> AuditResult<()> {
        if self.session.state != SessionState::Idle {
            warn!(
                session_id = %self.session.id,
                state = %self.session.state,
                "start rejected: session is not idle"
            );
            return Err(AuditError::SessionBusy {
                state: self.session.state.to_string(),
            });
        }

        info!(
            session_id = %self.session.id,
            url = %params.url(),
            max_pages = params.max_pages(),
            endpoint = %self.connection.endpoint(),
            "starting audit session"
        );
        self.session.state = SessionState::Connecting;

        let result = self.connection.start(&params).await;
        self.session.params = Some(params);

        match result {
            Ok(()) => {
                self.session.state = SessionState::Running;
                info!(session_id = %self.session.id, "audit session running");
                Ok(())
            }
            Err(e) => {
                self.fail(e.clone()).await;
                Err(e)
            }
        }
    }

    /// Wait for the next inbound frame without processing it.
    ///
    /// Cancel-safe: dropping the future loses no message.
    pub async fn recv(&mut self) -> Inbound {
        self.connection.recv().await
    }

    /// Apply one inbound frame to the session.
    ///
    /// Frames are processed one at a time, in the order they are passed in.
    /// Anything arriving outside `Running` is ignored.
    pub async fn handle(&mut self, inbound: Inbound) -> SessionState {
        if self.session.state != SessionState::Running {
            debug!(
                session_id = %self.session.id,
                state = %self.session.state,
                "ignoring inbound frame outside running state"
            );
            return self.session.state;
        }

        match inbound {
            Inbound::Message(WorkerMessage::Log(raw)) => {
                let event = classify(&raw);
                debug!(
                    session_id = %self.session.id,
                    kind = %event.kind,
                    message = %event.message,
                    "event appended"
                );
                self.session.timeline.append(event);
            }

            Inbound::Message(WorkerMessage::Complete(completion)) => {
                info!(
                    session_id = %self.session.id,
                    pages = completion.data.total_pages_analyzed,
                    "worker delivered final payload"
                );
                self.stop_pending = false;
                self.session.state = SessionState::Completed;
                self.session.outcome = Some(SessionOutcome::Completed(Box::new(completion.data)));
                self.connection.close().await;
            }

            Inbound::Message(WorkerMessage::Error(error)) => {
                let message = match error.message.trim() {
                    "" => "the worker reported an unspecified error".to_string(),
                    _ => error.message,
                };
                self.fail(AuditError::WorkerReportedError { message }).await;
            }

            Inbound::Disconnected => {
                self.fail(AuditError::ConnectionError {
                    reason: "worker disconnected before the audit completed".to_string(),
                })
                .await;
            }

            Inbound::Failed(error) => {
                self.fail(error).await;
            }
        }

        self.session.state
    }

    /// Receive and apply one frame, failing the session with `IdleTimeout`
    /// when `idle` elapses first.
    pub async fn pump(&mut self, idle: Option<Duration>) -> SessionState {
        if self.session.state != SessionState::Running {
            return self.session.state;
        }

        let inbound = match idle {
            Some(limit) => match tokio::time::timeout(limit, self.connection.recv()).await {
                Ok(inbound) => inbound,
                Err(_) => {
                    self.expire_idle(limit).await;
                    return self.session.state;
                }
            },
            None => self.connection.recv().await,
        };

        self.handle(inbound).await
    }

    /// `Running → Errored` because the worker went silent for `idle`.
    pub async fn expire_idle(&mut self, idle: Duration) {
        if self.session.state == SessionState::Running {
            self.fail(AuditError::IdleTimeout {
                secs: idle.as_secs(),
            })
            .await;
        }
    }

    /// Ask to stop a running session. Returns whether a stop is now pending.
    pub fn request_stop(&mut self) -> bool {
        if self.session.state == SessionState::Running {
            self.stop_pending = true;
        }
        self.stop_pending
    }

    /// Withdraw a pending stop request.
    pub fn cancel_stop(&mut self) {
        self.stop_pending = false;
    }

    /// `Running → Stopped`, if a stop is pending.
    ///
    /// Sends the stop command, closes the channel, and appends one `stopped`
    /// event. Any later call is a no-op.
    pub async fn confirm_stop(&mut self) -> SessionState {
        if self.session.state != SessionState::Running || !self.stop_pending {
            return self.session.state;
        }

        self.connection.stop().await;
        self.session
            .timeline
            .append(LogEvent::new(LogKind::Stopped, STOPPED_MESSAGE));
        self.session.state = SessionState::Stopped;
        self.session.outcome = Some(SessionOutcome::Stopped);
        self.stop_pending = false;

        info!(session_id = %self.session.id, "audit session stopped by user");
        self.session.state
    }

    /// Request and confirm in one call.
    pub async fn stop(&mut self) -> SessionState {
        self.request_stop();
        self.confirm_stop().await
    }

    /// Release the channel. Call when the live view goes away.
    pub fn dispose(&mut self) {
        self.connection.dispose();
    }

    /// Discard the current session and return to `Idle`.
    pub fn reset(&mut self) {
        self.connection.dispose();
        self.session = AuditSession::new();
        self.stop_pending = false;
    }

    async fn fail(&mut self, error: AuditError) {
        let message = match &error {
            AuditError::WorkerReportedError { message } => message.clone(),
            other => other.to_string(),
        };
        warn!(
            session_id = %self.session.id,
            error = %error,
            "audit session errored"
        );

        self.session
            .timeline
            .append(LogEvent::new(LogKind::Error, message));
        self.session.state = SessionState::Errored;
        self.session.outcome = Some(SessionOutcome::Errored(error));
        self.stop_pending = false;
        self.connection.close().await;
    }
}
