use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::messages::{ClientMessage, JoinMsg, ServerMessage};

/// Maximum inbound frame size in bytes. Larger frames are dropped
/// before decoding.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(String),
    PayloadTooLarge(usize),
    MalformedEnvelope(String),
    MissingPayload(&'static str),
    DeserializeError(String),
    SerializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(t) => write!(f, "unknown message type: {t}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            }
            Self::MalformedEnvelope(e) => write!(f, "malformed message envelope: {e}"),
            Self::MissingPayload(tag) => write!(f, "missing payload for {tag}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Raw message envelope. Unrecognized envelope fields are ignored;
/// identity is taken from the connection binding, never the payload.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

fn payload<T: DeserializeOwned>(
    data: Option<serde_json::Value>,
    tag: &'static str,
) -> Result<T, ProtocolError> {
    let value = data.ok_or(ProtocolError::MissingPayload(tag))?;
    serde_json::from_value(value).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode an inbound text frame into a `ClientMessage`.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }

    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;

    match envelope.kind.as_str() {
        "join" => Ok(ClientMessage::Join(payload::<JoinMsg>(
            envelope.data,
            "join",
        )?)),
        "leave" => Ok(ClientMessage::Leave),
        "start_game" => Ok(ClientMessage::StartGame),
        "ping" => Ok(ClientMessage::Ping),
        "submit_prompt" => Ok(ClientMessage::SubmitPrompt(
            envelope.data.unwrap_or(serde_json::Value::Null),
        )),
        "submit_drawing" => Ok(ClientMessage::SubmitDrawing(
            envelope.data.unwrap_or(serde_json::Value::Null),
        )),
        "submit_answer" => Ok(ClientMessage::SubmitAnswer(
            envelope.data.unwrap_or(serde_json::Value::Null),
        )),
        other => Err(ProtocolError::UnknownMessageType(other.to_string())),
    }
}

/// Encode an outbound `ServerMessage` as a JSON text frame.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Encode a `ClientMessage` as a JSON text frame. Used by test clients;
/// the server only decodes.
pub fn encode_client_message(msg: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}
