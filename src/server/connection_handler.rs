use crate::model::{ClientCommand, ClientId, MatchError};
use crate::pairing::{ClientState, Outbound, PairingStats, RelayRouter, RouterConfig};
use crate::server::{Connection, ConnectionRepository, ConnectionTransport, Transport};
use async_trait::async_trait;
use axum::extract::ws::Message;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle callbacks a transport invokes for its clients.
#[async_trait]
pub trait ClientEventHandler: Send + Sync {
    async fn on_connect(&self, client_id: ClientId) -> Result<(), MatchError>;

    async fn on_disconnect(&self, client_id: ClientId) -> Result<(), MatchError>;

    async fn on_event(&self, client_id: ClientId, command: ClientCommand)
        -> Result<(), MatchError>;
}

/// Shared entry point for all connections.
///
/// The router sits behind one mutex. Every event locks it and queues the deliveries it decided
/// on before releasing it, so each client receives events in the order the router produced
/// them. Queueing never waits on a socket: a client whose outgoing queue is full is dropped.
#[derive(Clone)]
pub struct ConnectionHandler {
    router: Arc<Mutex<RelayRouter>>,
    connection_repo: Arc<dyn ConnectionRepository>,
    transport: Arc<dyn Transport>,
}

impl ConnectionHandler {
    pub fn new(config: RouterConfig, connection_repo: Arc<dyn ConnectionRepository>) -> Self {
        let transport = Arc::new(ConnectionTransport::new(connection_repo.clone()));
        Self::with_transport(config, connection_repo, transport)
    }

    pub fn with_transport(
        config: RouterConfig,
        connection_repo: Arc<dyn ConnectionRepository>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        ConnectionHandler {
            router: Arc::new(Mutex::new(RelayRouter::new(config))),
            connection_repo,
            transport,
        }
    }

    /// Registers a new connection under a fresh id and runs the connect handler for it.
    #[instrument(skip(self, sender))]
    pub async fn connect(&self, sender: Sender<Message>) -> Result<ClientId, MatchError> {
        let client_id = ClientId::new_v4();
        self.connection_repo
            .add_connection(Connection::new(client_id, sender))
            .await?;

        if let Err(e) = self.on_connect(client_id).await {
            self.connection_repo.remove_connection(client_id).await?;
            return Err(e);
        }
        Ok(client_id)
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), MatchError> {
        let result = self.on_disconnect(client_id).await;
        self.connection_repo.remove_connection(client_id).await?;
        result
    }

    pub async fn stats(&self) -> PairingStats {
        self.router.lock().await.stats()
    }

    pub async fn client_state(&self, client_id: ClientId) -> Option<ClientState> {
        self.router.lock().await.state().client_state(client_id)
    }

    pub async fn verify_invariants(&self) -> Result<(), MatchError> {
        self.router.lock().await.state().verify_invariants()
    }

    /// Queues `outbound` while the caller still holds the router.
    async fn dispatch(&self, router: &mut RelayRouter, outbound: Vec<Outbound>) {
        let mut pending = VecDeque::from(outbound);
        while let Some(delivery) = pending.pop_front() {
            let lagging = match &delivery {
                Outbound::To(client_id, event) => {
                    match self.transport.send_to(*client_id, event).await {
                        Ok(()) => Vec::new(),
                        Err(MatchError::SlowConsumer(client_id)) => vec![client_id],
                        Err(MatchError::TransportUnavailable(client_id)) => {
                            debug!(?client_id, "Dropped delivery to departed client");
                            Vec::new()
                        }
                        Err(e) => {
                            error!(?delivery, error = %e, "Delivery failed");
                            Vec::new()
                        }
                    }
                }
                Outbound::Broadcast(event) => {
                    self.transport.broadcast(event).await.unwrap_or_else(|e| {
                        error!(?delivery, error = %e, "Broadcast failed");
                        Vec::new()
                    })
                }
            };
            for client_id in lagging {
                pending.extend(self.evict(router, client_id).await);
            }
        }
    }

    /// Drops a client that stopped draining its socket and returns what its departure causes.
    async fn evict(&self, router: &mut RelayRouter, client_id: ClientId) -> Vec<Outbound> {
        warn!(?client_id, "Outgoing queue full, dropping client");
        // Releasing the sender ends the client's send pump, which closes the socket.
        if let Err(e) = self.connection_repo.remove_connection(client_id).await {
            error!(?client_id, error = %e, "Failed to remove lagging connection");
        }
        router.on_disconnect(client_id)
    }
}

#[async_trait]
impl ClientEventHandler for ConnectionHandler {
    async fn on_connect(&self, client_id: ClientId) -> Result<(), MatchError> {
        let mut router = self.router.lock().await;
        let outbound = router.on_connect(client_id)?;
        info!(?client_id, "Client connected");
        self.dispatch(&mut router, outbound).await;
        Ok(())
    }

    async fn on_disconnect(&self, client_id: ClientId) -> Result<(), MatchError> {
        let mut router = self.router.lock().await;
        let outbound = router.on_disconnect(client_id);
        info!(?client_id, "Client disconnected");
        self.dispatch(&mut router, outbound).await;
        Ok(())
    }

    #[instrument(skip(self, command), fields(command_type = command.get_type()))]
    async fn on_event(
        &self,
        client_id: ClientId,
        command: ClientCommand,
    ) -> Result<(), MatchError> {
        let mut router = self.router.lock().await;
        let outbound = router.on_event(client_id, command);
        self.dispatch(&mut router, outbound).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServerEvent;
    use crate::pairing::{MatchMode, UnpairedChatPolicy};
    use crate::server::MemoryStorage;
    use tokio::sync::mpsc::{channel, Receiver};

    fn handler(config: RouterConfig) -> ConnectionHandler {
        ConnectionHandler::new(config, Arc::new(MemoryStorage::new()))
    }

    async fn connect(handler: &ConnectionHandler) -> (ClientId, Receiver<Message>) {
        let (tx, rx) = channel(32);
        let client_id = handler.connect(tx).await.unwrap();
        (client_id, rx)
    }

    fn drain(rx: &mut Receiver<Message>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Message::Text(text) = message {
                events.push(serde_json::from_str(&text).unwrap());
            }
        }
        events
    }

    #[tokio::test]
    async fn test_connect_assigns_id_and_pairs() {
        let handler = handler(RouterConfig::default());
        let (a, mut rx_a) = connect(&handler).await;
        let (b, mut rx_b) = connect(&handler).await;

        assert_eq!(
            drain(&mut rx_a),
            vec![
                ServerEvent::IdAssigned { client_id: a },
                ServerEvent::Waiting,
                ServerEvent::PartnerFound {
                    partner_id: b,
                    initiator: false
                },
            ]
        );
        assert_eq!(
            drain(&mut rx_b),
            vec![
                ServerEvent::IdAssigned { client_id: b },
                ServerEvent::PartnerFound {
                    partner_id: a,
                    initiator: true
                },
            ]
        );
        assert_eq!(handler.stats().await.pairs, 1);
    }

    #[tokio::test]
    async fn test_chat_reaches_partner_only() {
        let handler = handler(RouterConfig::default());
        let (a, mut rx_a) = connect(&handler).await;
        let (_b, mut rx_b) = connect(&handler).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        handler
            .on_event(
                a,
                ClientCommand::ChatMessage {
                    message: "hi".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::ChatMessage {
                from: a,
                message: "hi".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_unpaired_broadcast_reaches_everyone() {
        let handler = handler(RouterConfig {
            match_mode: MatchMode::OptIn,
            unpaired_chat: UnpairedChatPolicy::Broadcast,
            ..Default::default()
        });
        let (sender, mut rx_sender) = connect(&handler).await;
        let mut others = Vec::new();
        for _ in 0..3 {
            others.push(connect(&handler).await);
        }
        drain(&mut rx_sender);
        for (_, rx) in others.iter_mut() {
            drain(rx);
        }

        handler
            .on_event(
                sender,
                ClientCommand::ChatMessage {
                    message: "hello?".to_string(),
                },
            )
            .await
            .unwrap();

        let expected = vec![ServerEvent::ChatMessage {
            from: sender,
            message: "hello?".to_string(),
        }];
        for (_, rx) in others.iter_mut() {
            assert_eq!(drain(rx), expected);
        }
        assert_eq!(drain(&mut rx_sender), expected);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_partner() {
        let handler = handler(RouterConfig::default());
        let (a, mut rx_a) = connect(&handler).await;
        let (b, mut rx_b) = connect(&handler).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        handler.disconnect(a).await.unwrap();

        assert_eq!(
            drain(&mut rx_b),
            vec![
                ServerEvent::PartnerDisconnected { partner_id: a },
                ServerEvent::Waiting,
            ]
        );
        assert!(handler.connection_repo.get_connection(a).await.unwrap().is_none());
        assert!(handler.connection_repo.get_connection(b).await.unwrap().is_some());
        handler.verify_invariants().await.unwrap();

        // A second disconnect is a no-op.
        assert!(handler.disconnect(a).await.is_ok());
    }

    #[tokio::test]
    async fn test_delivery_to_closed_channel_is_dropped() {
        let handler = handler(RouterConfig::default());
        let (a, rx_a) = connect(&handler).await;
        drop(rx_a);
        let (_b, mut rx_b) = connect(&handler).await;

        assert!(handler.on_event(a, ClientCommand::Ping).await.is_ok());
        assert_eq!(drain(&mut rx_b).len(), 2);
    }

    #[tokio::test]
    async fn test_client_that_stops_reading_is_dropped() {
        let handler = handler(RouterConfig::default());
        // a never drains: id-assigned and waiting fill its queue.
        let (tx_a, mut rx_a) = channel(2);
        let a = handler.connect(tx_a).await.unwrap();

        let (tx_b, mut rx_b) = channel(32);
        let b = tokio::time::timeout(std::time::Duration::from_secs(2), handler.connect(tx_b))
            .await
            .expect("connect must not wait on another client's queue")
            .unwrap();

        assert_eq!(
            drain(&mut rx_b),
            vec![
                ServerEvent::IdAssigned { client_id: b },
                ServerEvent::PartnerFound {
                    partner_id: a,
                    initiator: true
                },
                ServerEvent::PartnerDisconnected { partner_id: a },
                ServerEvent::Waiting,
            ]
        );
        assert!(handler.connection_repo.get_connection(a).await.unwrap().is_none());
        assert_eq!(handler.client_state(a).await, None);
        assert_eq!(handler.client_state(b).await, Some(ClientState::Waiting));
        handler.verify_invariants().await.unwrap();

        // The two queued events are still delivered, then the pump sees the channel close.
        assert_eq!(drain(&mut rx_a).len(), 2);
        assert_eq!(rx_a.recv().await, None);
    }

    #[tokio::test]
    async fn test_broadcast_drops_lagging_client() {
        let handler = handler(RouterConfig {
            match_mode: MatchMode::OptIn,
            unpaired_chat: UnpairedChatPolicy::Broadcast,
            ..Default::default()
        });
        let (sender, mut rx_sender) = connect(&handler).await;
        let (tx_slow, _rx_slow) = channel(1);
        let slow = handler.connect(tx_slow).await.unwrap();
        drain(&mut rx_sender);

        handler
            .on_event(
                sender,
                ClientCommand::ChatMessage {
                    message: "hello?".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(handler.client_state(slow).await, None);
        assert_eq!(handler.stats().await.connected, 1);
        assert_eq!(drain(&mut rx_sender).len(), 1);
    }
}
