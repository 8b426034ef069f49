use super::Connection;
use crate::model::{ClientId, MatchError};
use async_trait::async_trait;

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn add_connection(&self, connection: Connection) -> Result<(), MatchError>;
    async fn remove_connection(&self, id: ClientId) -> Result<(), MatchError>;
    async fn get_connection(&self, id: ClientId) -> Result<Option<Connection>, MatchError>;
    async fn get_all_connections(&self) -> Result<Vec<Connection>, MatchError>;
}
