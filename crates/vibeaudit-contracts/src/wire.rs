//! Messages exchanged with the remote audit worker.
//!
//! Every frame is one JSON object `{"event": <name>, "data": <payload>}`.
//! Inbound frames without a known envelope are still delivered, as an
//! untagged log carrying the raw text, so nothing the worker says is lost.
//! A `complete` frame whose payload cannot be decoded is an error, never a log.

use serde::{Deserialize, Serialize};

use crate::{
    error::{AuditError, AuditResult},
    payload::{null_as_default, FinalPayload},
    session::AuditParams,
};

/// Client → worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    StartAnalysis(StartAnalysis),
    StopAnalysis,
}

/// Body of the start command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAnalysis {
    pub url: String,
    pub max_pages: u32,
    pub user_intent: Option<String>,
}

impl From<&AuditParams> for StartAnalysis {
    fn from(params: &AuditParams) -> Self {
        Self {
            url: params.url().to_string(),
            max_pages: params.max_pages(),
            user_intent: params.intent().map(str::to_string),
        }
    }
}

/// Worker → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    Log(RawLog),
    Complete(Completion),
    Error(WorkerError),
}

/// A log line as the worker sends it. `kind` is the loosely-typed wire tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: FinalPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// What a transport yields on each receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// One decoded frame, in arrival order.
    Message(WorkerMessage),
    /// The worker closed the channel or the stream ended.
    Disconnected,
    /// The channel failed after it was open, or a terminal frame could not
    /// be decoded.
    Failed(AuditError),
}

impl Inbound {
    /// Decode one text frame into what the session should act on.
    pub fn from_frame(text: &str) -> Self {
        match parse_frame(text) {
            Ok(message) => Self::Message(message),
            Err(error) => Self::Failed(error),
        }
    }
}

/// The outer `{"event", "data"}` shape, decoded before the body.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

fn untagged_log(text: &str) -> WorkerMessage {
    WorkerMessage::Log(RawLog {
        message: text.to_string(),
        kind: None,
        viewport: None,
    })
}

/// Decode one text frame from the worker.
///
/// A frame without a known envelope becomes an untagged log carrying the raw
/// text, which classifies as `info`. So does a `log` frame with a malformed
/// body. An `error` frame always stays an error. A `complete` frame whose
/// payload does not decode fails with `PayloadDecode`.
pub fn parse_frame(text: &str) -> AuditResult<WorkerMessage> {
    let Ok(envelope) = serde_json::from_str::<Envelope>(text) else {
        return Ok(untagged_log(text));
    };

    match envelope.event.as_str() {
        "log" => Ok(serde_json::from_value(envelope.data)
            .map(WorkerMessage::Log)
            .unwrap_or_else(|_| untagged_log(text))),
        "complete" => serde_json::from_value(envelope.data)
            .map(WorkerMessage::Complete)
            .map_err(|e| AuditError::PayloadDecode {
                reason: format!("final payload does not decode: {e}"),
            }),
        "error" => {
            let error = match envelope.data {
                serde_json::Value::Null => WorkerError::default(),
                serde_json::Value::String(message) => WorkerError { message },
                data => serde_json::from_value(data.clone()).unwrap_or_else(|_| WorkerError {
                    message: data.to_string(),
                }),
            };
            Ok(WorkerMessage::Error(error))
        }
        _ => Ok(untagged_log(text)),
    }
}
