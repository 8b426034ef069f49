mod connection;
mod connection_handler;
mod connection_repository;
mod memory_storage;
mod route;
pub mod telemetry;
mod transport;
pub mod websocket_listener;

pub use connection::Connection;
pub use connection_handler::{ClientEventHandler, ConnectionHandler};
pub use connection_repository::ConnectionRepository;
pub use memory_storage::MemoryStorage;
pub use route::create_router;
pub use transport::{ConnectionTransport, Transport};
