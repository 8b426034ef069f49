use super::ClientId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Client not found: {0}")]
    NotFound(ClientId),
    #[error("Client already registered: {0}")]
    AlreadyRegistered(ClientId),
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Client not reachable: {0}")]
    TransportUnavailable(ClientId),
    #[error("Outgoing queue full for client: {0}")]
    SlowConsumer(ClientId),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for MatchError {
    fn from(e: serde_json::Error) -> Self {
        MatchError::InvalidData(e.to_string())
    }
}
