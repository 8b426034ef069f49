use super::{Connection, ConnectionRepository};
use crate::model::{ClientId, MatchError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, instrument};

type Connections = HashMap<ClientId, Connection>;

/// Live connections keyed by client id.
#[derive(Default)]
pub struct MemoryStorage {
    connections: RwLock<Connections>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Connections>, MatchError> {
        self.connections.read().map_err(|e| {
            error!(error = %e, "Connection map poisoned");
            MatchError::InternalError(e.to_string())
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Connections>, MatchError> {
        self.connections.write().map_err(|e| {
            error!(error = %e, "Connection map poisoned");
            MatchError::InternalError(e.to_string())
        })
    }
}

#[async_trait]
impl ConnectionRepository for MemoryStorage {
    #[instrument(skip(self, connection), fields(client_id = ?connection.client_id))]
    async fn add_connection(&self, connection: Connection) -> Result<(), MatchError> {
        let mut connections = self.write()?;
        if connections.contains_key(&connection.client_id) {
            return Err(MatchError::AlreadyRegistered(connection.client_id));
        }
        connections.insert(connection.client_id, connection);
        debug!(connection_count = connections.len(), "Connection added");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_connection(&self, id: ClientId) -> Result<(), MatchError> {
        let mut connections = self.write()?;
        if connections.remove(&id).is_some() {
            debug!(connection_count = connections.len(), "Connection removed");
        }
        Ok(())
    }

    async fn get_connection(&self, id: ClientId) -> Result<Option<Connection>, MatchError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn get_all_connections(&self) -> Result<Vec<Connection>, MatchError> {
        Ok(self.read()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        Connection::new(ClientId::new_v4(), tokio::sync::mpsc::channel(1).0)
    }

    #[tokio::test]
    async fn test_add_connection() {
        let storage = MemoryStorage::new();
        let connection = connection();
        let result = storage.add_connection(connection.clone()).await;
        assert!(result.is_ok());
        assert_eq!(
            storage.get_connection(connection.client_id).await.unwrap(),
            Some(connection)
        );
    }

    #[tokio::test]
    async fn test_add_duplicate_connection() {
        let storage = MemoryStorage::new();
        let connection = connection();
        storage.add_connection(connection.clone()).await.unwrap();
        assert_eq!(
            storage.add_connection(connection.clone()).await,
            Err(MatchError::AlreadyRegistered(connection.client_id))
        );
    }

    #[tokio::test]
    async fn test_remove_connection() {
        let storage = MemoryStorage::new();
        let connection = connection();
        storage.add_connection(connection.clone()).await.unwrap();
        let result = storage.remove_connection(connection.client_id).await;
        assert!(result.is_ok());
        assert_eq!(
            storage.get_connection(connection.client_id).await.unwrap(),
            None
        );
        // Removing twice is not an error.
        assert!(storage.remove_connection(connection.client_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_all_connections() {
        let storage = MemoryStorage::new();
        storage.add_connection(connection()).await.unwrap();
        storage.add_connection(connection()).await.unwrap();

        assert_eq!(storage.get_all_connections().await.unwrap().len(), 2);
    }
}
