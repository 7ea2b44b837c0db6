use serde_json::Value;
use thiserror::Error;

/// One turn of the rolling conversation as reported by the provider.
/// Roles other than `user` are treated as agent speech.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub role: String,
    pub content: String,
}

impl TranscriptTurn {
    pub fn is_driver(&self) -> bool {
        self.role == "user"
    }
}

/// Closed model of the provider's webhook stream. Anything outside the
/// three known event kinds lands in `Unknown` and is acknowledged without
/// side effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    CallStarted { call_id: String },
    CallEnded { call_id: String, transcript: String },
    AgentResponseRequired { call_id: String, history: Vec<TranscriptTurn>, user_utterance: String },
    Unknown { event_type: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookParseError {
    #[error("webhook payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("webhook payload is missing the `event` field")]
    MissingEvent,
    #[error("webhook payload for `{event_type}` is missing the `call_id` field")]
    MissingCallId { event_type: String },
}

impl WebhookEvent {
    pub fn parse(body: &str) -> Result<Self, WebhookParseError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|err| WebhookParseError::InvalidJson(err.to_string()))?;

        let event_type = value
            .get("event")
            .and_then(Value::as_str)
            .filter(|event| !event.is_empty())
            .ok_or(WebhookParseError::MissingEvent)?;

        let call_id = || {
            value
                .get("call_id")
                .and_then(Value::as_str)
                .filter(|call_id| !call_id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| WebhookParseError::MissingCallId {
                    event_type: event_type.to_string(),
                })
        };

        match event_type {
            "call_started" => Ok(Self::CallStarted { call_id: call_id()? }),
            "call_ended" => Ok(Self::CallEnded {
                call_id: call_id()?,
                transcript: value
                    .get("transcript")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            "agent_response_required" => Ok(Self::AgentResponseRequired {
                call_id: call_id()?,
                history: parse_history(value.get("transcript")),
                user_utterance: value
                    .get("user_utterance")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            other => Ok(Self::Unknown { event_type: other.to_string() }),
        }
    }
}

fn parse_history(raw: Option<&Value>) -> Vec<TranscriptTurn> {
    let Some(Value::Array(turns)) = raw else {
        return Vec::new();
    };

    turns
        .iter()
        .map(|turn| TranscriptTurn {
            role: turn
                .get("role")
                .and_then(Value::as_str)
                .unwrap_or("agent")
                .to_string(),
            content: turn
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}
