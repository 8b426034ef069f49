use super::ConnectionRepository;
use crate::model::{ClientId, MatchError, ServerEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Delivery capability the router's decisions are carried out with.
///
/// Implementations only queue: neither method may wait on a client's socket.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fails with [`MatchError::TransportUnavailable`] when the client is gone and with
    /// [`MatchError::SlowConsumer`] when its outgoing queue is full.
    async fn send_to(&self, client_id: ClientId, event: &ServerEvent) -> Result<(), MatchError>;

    /// Queues `event` for every connected client and returns those whose queue was full.
    async fn broadcast(&self, event: &ServerEvent) -> Result<Vec<ClientId>, MatchError>;
}

/// Sends JSON text frames through the per-connection channels of a [`ConnectionRepository`].
#[derive(Clone)]
pub struct ConnectionTransport {
    connection_repo: Arc<dyn ConnectionRepository>,
}

impl ConnectionTransport {
    pub fn new(connection_repo: Arc<dyn ConnectionRepository>) -> Self {
        Self { connection_repo }
    }
}

#[async_trait]
impl Transport for ConnectionTransport {
    async fn send_to(&self, client_id: ClientId, event: &ServerEvent) -> Result<(), MatchError> {
        let connection = self
            .connection_repo
            .get_connection(client_id)
            .await?
            .ok_or(MatchError::TransportUnavailable(client_id))?;
        connection.send_text(serde_json::to_string(event)?)
    }

    async fn broadcast(&self, event: &ServerEvent) -> Result<Vec<ClientId>, MatchError> {
        let text = serde_json::to_string(event)?;
        let mut lagging = Vec::new();
        for connection in self.connection_repo.get_all_connections().await? {
            match connection.send_text(text.clone()) {
                Ok(()) => {}
                Err(MatchError::SlowConsumer(client_id)) => lagging.push(client_id),
                Err(_) => {
                    debug!(client_id = ?connection.client_id, "Skipping closed connection");
                }
            }
        }
        Ok(lagging)
    }
}
