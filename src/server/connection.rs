use crate::model::{ClientId, MatchError};
use axum::extract::ws::Message;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

/// Outgoing half of a client's socket, fed by the listener's send pump.
#[derive(Debug, Clone)]
pub struct Connection {
    pub client_id: ClientId,
    pub sender: Sender<Message>,
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id
    }
}

impl Connection {
    pub fn new(client_id: ClientId, sender: Sender<Message>) -> Self {
        Connection { client_id, sender }
    }

    /// Queues an encoded event for this client's socket without waiting for room.
    pub fn send_text(&self, text: String) -> Result<(), MatchError> {
        self.sender
            .try_send(Message::Text(text))
            .map_err(|e| match e {
                TrySendError::Full(_) => MatchError::SlowConsumer(self.client_id),
                TrySendError::Closed(_) => MatchError::TransportUnavailable(self.client_id),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::channel;

    #[test]
    fn test_partial_eq() {
        let client_id = ClientId::new_v4();
        let connection = Connection::new(client_id, channel(1).0);
        let connection2 = Connection::new(client_id, channel(1).0);
        assert_eq!(connection, connection2);
        assert_ne!(connection, Connection::new(ClientId::new_v4(), channel(1).0));
    }

    #[test]
    fn test_send_text_after_receiver_dropped() {
        let client_id = ClientId::new_v4();
        let (tx, rx) = channel(1);
        let connection = Connection::new(client_id, tx);
        drop(rx);
        assert_eq!(
            connection.send_text("{}".to_string()),
            Err(MatchError::TransportUnavailable(client_id))
        );
    }

    #[test]
    fn test_send_text_to_full_queue() {
        let client_id = ClientId::new_v4();
        let (tx, _rx) = channel(1);
        let connection = Connection::new(client_id, tx);
        assert!(connection.send_text("{}".to_string()).is_ok());
        assert_eq!(
            connection.send_text("{}".to_string()),
            Err(MatchError::SlowConsumer(client_id))
        );
    }
}
