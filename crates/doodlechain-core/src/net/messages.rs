use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId};
use crate::room::{Room, RoomId};

/// Messages a client may send over the live connection.
///
/// The wire shape is a `{"type": ..., "data": ...}` envelope; tags are
/// snake_case and payload fields camelCase. The enum is closed: adding
/// a tag forces every dispatch site to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinMsg),
    Leave,
    StartGame,
    Ping,
    // Gameplay submissions are accepted but not yet acted on; the
    // payload is carried opaquely for logging.
    SubmitPrompt(serde_json::Value),
    SubmitDrawing(serde_json::Value),
    SubmitAnswer(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMsg {
    pub player_name: String,
    pub room_id: RoomId,
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    JoinSuccess { room: Room, player_id: PlayerId },
    PlayerJoined { player: Player, room: Room },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId, room: Room },
    #[serde(rename_all = "camelCase")]
    PlayerDisconnected { player_id: PlayerId, room: Room },
    GameStarted { room: Room },
    Error { message: String },
    Pong,
}

impl ClientMessage {
    /// Wire tag for this message, as it appears in the envelope.
    pub fn tag(&self) -> &'static str {
        match self {
            ClientMessage::Join(_) => "join",
            ClientMessage::Leave => "leave",
            ClientMessage::StartGame => "start_game",
            ClientMessage::Ping => "ping",
            ClientMessage::SubmitPrompt(_) => "submit_prompt",
            ClientMessage::SubmitDrawing(_) => "submit_drawing",
            ClientMessage::SubmitAnswer(_) => "submit_answer",
        }
    }
}
