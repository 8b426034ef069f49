mod client;
mod command;
mod error;

pub use client::{ClientId, ClientRecord};
pub use command::{ClientCommand, ServerEvent, SignalKind};
pub use error::MatchError;
