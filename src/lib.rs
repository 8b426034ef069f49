pub mod config;
pub mod model;
pub mod pairing;

#[cfg(feature = "server")]
pub mod server;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::model::ClientCommand;
    pub use crate::model::ClientId;
    pub use crate::model::MatchError;
    pub use crate::model::ServerEvent;
    pub use crate::model::SignalKind;
    pub use crate::pairing::MatchMode;
    pub use crate::pairing::Outbound;
    pub use crate::pairing::RelayRouter;
    pub use crate::pairing::RouterConfig;
    pub use crate::pairing::SignalPolicy;
    pub use crate::pairing::UnpairedChatPolicy;
}
