//! Host ⇄ worker message protocol.
//!
//! Every message is a JSON object tagged by `type`. Inbound payload fields are
//! camelCase, matching what a browser host posts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::WorkerError;
use crate::engine_state::proxy::{ProxyEventData, ProxyId};

/// Inbound `type` tags the worker understands.
pub const INBOUND_TYPES: [&str; 7] = [
    "makeProxy",
    "event",
    "start",
    "resize",
    "runPythonCode",
    "evaluateChallenge",
    "terminate",
];

/// Payload of `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    /// Opaque surface handle. Native hosts bind the surface ahead of time and omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Value>,
    /// Surface width in pixels
    pub width: f64,
    /// Surface height in pixels
    pub height: f64,
    /// Side length of the voxel grid
    pub grid_size: usize,
    /// Proxy entry that receives the surface's input events
    pub canvas_id: ProxyId,
    /// Whether to attach an orbit controller
    #[serde(default = "enabled")]
    pub enable_orbit_controls: bool,
}

fn enabled() -> bool {
    true
}

/// A message from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// Register a proxy entry
    MakeProxy { id: ProxyId },
    /// Forward an input event to a proxy entry
    Event { id: ProxyId, data: ProxyEventData },
    /// Create the grid, scene and render loop
    Start(StartParams),
    /// Resize the render surface
    Resize { width: f64, height: f64 },
    /// Populate the grid from a script and show it
    RunPythonCode {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grid_size: Option<usize>,
    },
    /// Compare two scripts without disturbing the live grid
    EvaluateChallenge { target_code: String, user_code: String },
    /// Release everything and stop
    Terminate,
}

impl InboundMessage {
    /// Decodes one message.
    ///
    /// # Returns
    /// The message, `WorkerError::UnknownMessage` for an unrecognised `type`,
    /// or `WorkerError::MalformedMessage` for anything that does not decode
    pub fn decode(text: &str) -> Result<Self, WorkerError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| WorkerError::MalformedMessage("missing string field `type`".into()))?;
        if !INBOUND_TYPES.contains(&kind) {
            return Err(WorkerError::UnknownMessage(kind.to_owned()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encodes the message as JSON text.
    pub fn encode(&self) -> String {
        // Every field is a plain string, number, bool or JSON value.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::MakeProxy { .. } => "makeProxy",
            InboundMessage::Event { .. } => "event",
            InboundMessage::Start(_) => "start",
            InboundMessage::Resize { .. } => "resize",
            InboundMessage::RunPythonCode { .. } => "runPythonCode",
            InboundMessage::EvaluateChallenge { .. } => "evaluateChallenge",
            InboundMessage::Terminate => "terminate",
        }
    }
}

/// Outcome carried by acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// A message to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// The worker is accepting messages
    Ready,
    /// `start` finished
    Init { status: Status },
    /// `resize` finished
    Resize { status: Status },
    /// `runPythonCode` finished
    RunPythonCode { status: Status },
    /// `terminate` finished
    Terminate { status: Status },
    /// An operation failed
    Error { message: String },
    /// A cell failed to evaluate; the run continued
    Warning { message: String },
    /// Result of `evaluateChallenge`
    ChallengeResult {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        similarity: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl OutboundMessage {
    /// An `error` reply.
    pub fn error(message: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
        }
    }

    /// Encodes the message as JSON text.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decodes a message, as a host would.
    pub fn decode(text: &str) -> Result<Self, WorkerError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_start_with_defaults() {
        let message = InboundMessage::decode(
            r#"{"type":"start","width":640,"height":480.5,"gridSize":8,"canvasId":3}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            InboundMessage::Start(StartParams {
                canvas: None,
                width: 640.0,
                height: 480.5,
                grid_size: 8,
                canvas_id: ProxyId::new("3"),
                enable_orbit_controls: true,
            })
        );
    }

    #[test]
    fn decodes_run_and_challenge_field_names() {
        assert_eq!(
            InboundMessage::decode(r#"{"type":"runPythonCode","code":"x","gridSize":4}"#).unwrap(),
            InboundMessage::RunPythonCode { code: "x".into(), grid_size: Some(4) }
        );
        assert_eq!(
            InboundMessage::decode(r#"{"type":"evaluateChallenge","targetCode":"a","userCode":"b"}"#)
                .unwrap(),
            InboundMessage::EvaluateChallenge { target_code: "a".into(), user_code: "b".into() }
        );
    }

    #[test]
    fn unknown_and_malformed_messages_are_distinguished() {
        assert_eq!(
            InboundMessage::decode(r#"{"type":"explode"}"#),
            Err(WorkerError::UnknownMessage("explode".into()))
        );
        assert!(matches!(
            InboundMessage::decode(r#"{"type":"resize","width":"wide"}"#),
            Err(WorkerError::MalformedMessage(_))
        ));
        assert!(matches!(InboundMessage::decode("not json"), Err(WorkerError::MalformedMessage(_))));
        assert!(matches!(InboundMessage::decode("{}"), Err(WorkerError::MalformedMessage(_))));
    }

    #[test]
    fn outbound_messages_match_the_wire_format() {
        assert_eq!(OutboundMessage::Ready.encode(), r#"{"type":"ready"}"#);
        assert_eq!(
            OutboundMessage::RunPythonCode { status: Status::Success }.encode(),
            r#"{"type":"runPythonCode","status":"success"}"#
        );
        assert_eq!(
            OutboundMessage::ChallengeResult { status: Status::Success, similarity: Some(0.5), message: None }
                .encode(),
            r#"{"type":"challengeResult","status":"success","similarity":0.5}"#
        );
    }

    #[test]
    fn inbound_messages_encode_for_posting() {
        let message = InboundMessage::Event {
            id: ProxyId::new("c"),
            data: ProxyEventData::ContextMenu,
        };
        let text = message.encode();
        assert_eq!(InboundMessage::decode(&text).unwrap(), message);
        assert_eq!(message.kind(), "event");
    }
}
