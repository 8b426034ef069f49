use super::ClientId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// WebRTC handshake step carried by a signal. The payload itself is never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "offer")]
    Offer,
    #[serde(rename = "answer")]
    Answer,
    #[serde(rename = "candidate")]
    Candidate,
}

/// Inbound events a client can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "ready-for-partner")]
    ReadyForPartner,
    #[serde(rename = "find-new-partner")]
    FindNewPartner,
    #[serde(rename = "chat-message")]
    ChatMessage { message: String },
    #[serde(rename = "signal")]
    Signal {
        kind: SignalKind,
        target: ClientId,
        payload: Value,
    },
    #[serde(rename = "ping")]
    Ping,
}

impl ClientCommand {
    pub fn get_type(&self) -> &'static str {
        match self {
            ClientCommand::ReadyForPartner => "ready-for-partner",
            ClientCommand::FindNewPartner => "find-new-partner",
            ClientCommand::ChatMessage { .. } => "chat-message",
            ClientCommand::Signal { .. } => "signal",
            ClientCommand::Ping => "ping",
        }
    }
}

/// Outbound notifications delivered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "id-assigned")]
    IdAssigned { client_id: ClientId },
    #[serde(rename = "waiting")]
    Waiting,
    /// `initiator` is set on exactly one side of a new pairing; that side creates the offer.
    #[serde(rename = "partner-found")]
    PartnerFound { partner_id: ClientId, initiator: bool },
    #[serde(rename = "partner-disconnected")]
    PartnerDisconnected { partner_id: ClientId },
    #[serde(rename = "chat-message")]
    ChatMessage { from: ClientId, message: String },
    #[serde(rename = "signal")]
    Signal {
        kind: SignalKind,
        sender: ClientId,
        payload: Value,
    },
    #[serde(rename = "pong")]
    Pong,
}
