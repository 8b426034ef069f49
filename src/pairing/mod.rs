//! Partner matching and message relay.
//!
//! [`RelayRouter`] owns the [`PairingState`] (a [`ClientRegistry`] plus a [`WaitingQueue`]) and
//! is purely synchronous: every handler returns the [`Outbound`] deliveries it decided on and
//! leaves the actual sending to the caller, after the state lock is released.

mod matcher;
mod registry;
mod router;
mod waiting_queue;

pub use matcher::{ClientState, PairingState, PairingStats};
pub use registry::ClientRegistry;
pub use router::{MatchMode, Outbound, RelayRouter, RouterConfig, SignalPolicy, UnpairedChatPolicy};
pub use waiting_queue::WaitingQueue;
