use super::{PairingState, PairingStats};
use crate::model::{ClientCommand, ClientId, MatchError, ServerEvent, SignalKind};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

/// When a freshly connected client enters matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Match attempt right on connect.
    #[default]
    Auto,
    /// Wait for an explicit `ready-for-partner`.
    OptIn,
}

/// What happens to a chat message sent while the client has no partner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnpairedChatPolicy {
    #[default]
    Echo,
    /// Deliver to every connected client, sender included. Strangers see the message.
    Broadcast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignalPolicy {
    #[default]
    AnyTarget,
    PartnerOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterConfig {
    pub match_mode: MatchMode,
    pub unpaired_chat: UnpairedChatPolicy,
    pub signal_policy: SignalPolicy,
}

/// A delivery the transport has to perform once the router released its state.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    To(ClientId, ServerEvent),
    Broadcast(ServerEvent),
}

/// Turns client lifecycle events and commands into pairing mutations and deliveries.
#[derive(Debug, Default)]
pub struct RelayRouter {
    state: PairingState,
    config: RouterConfig,
}

impl RelayRouter {
    pub fn new(config: RouterConfig) -> Self {
        RelayRouter {
            state: PairingState::new(),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn state(&self) -> &PairingState {
        &self.state
    }

    pub fn stats(&self) -> PairingStats {
        self.state.stats()
    }

    #[instrument(skip(self))]
    pub fn on_connect(&mut self, client_id: ClientId) -> Result<Vec<Outbound>, MatchError> {
        self.state.connect(client_id)?;
        info!(?client_id, mode = ?self.config.match_mode, "Client registered");

        let mut outbound = vec![Outbound::To(
            client_id,
            ServerEvent::IdAssigned { client_id },
        )];
        if self.config.match_mode == MatchMode::Auto {
            self.enter_matching(client_id, None, &mut outbound);
        }
        Ok(outbound)
    }

    #[instrument(skip(self))]
    pub fn on_disconnect(&mut self, client_id: ClientId) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        if !self.state.registry().exists(client_id) {
            debug!(?client_id, "Disconnect for unknown client");
            return outbound;
        }

        if let Some(partner) = self.state.disconnect(client_id) {
            info!(?client_id, ?partner, "Paired client left, re-queueing partner");
            outbound.push(Outbound::To(
                partner,
                ServerEvent::PartnerDisconnected {
                    partner_id: client_id,
                },
            ));
            self.enter_matching(partner, None, &mut outbound);
        }
        outbound
    }

    #[instrument(skip(self, command), fields(command_type = command.get_type()))]
    pub fn on_event(&mut self, client_id: ClientId, command: ClientCommand) -> Vec<Outbound> {
        if !self.state.registry().exists(client_id) {
            debug!(error = %MatchError::NotFound(client_id), "Ignoring command");
            return Vec::new();
        }

        match command {
            ClientCommand::ReadyForPartner => self.ready_for_partner(client_id),
            ClientCommand::FindNewPartner => self.find_new_partner(client_id),
            ClientCommand::ChatMessage { message } => self.chat_message(client_id, message),
            ClientCommand::Signal {
                kind,
                target,
                payload,
            } => self.signal(client_id, kind, target, payload),
            ClientCommand::Ping => vec![Outbound::To(client_id, ServerEvent::Pong)],
        }
    }

    fn ready_for_partner(&mut self, client_id: ClientId) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        if let Some(partner) = self.live_partner(client_id, &mut outbound) {
            debug!(?client_id, ?partner, "Already paired, ignoring ready");
            return outbound;
        }
        // A resolved stale pairing has already re-entered matching.
        if outbound.is_empty() {
            self.enter_matching(client_id, None, &mut outbound);
        }
        outbound
    }

    fn find_new_partner(&mut self, client_id: ClientId) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        match self.state.unpair(client_id) {
            Some(former) => {
                info!(?client_id, ?former, "Client skipped partner");
                outbound.push(Outbound::To(
                    former,
                    ServerEvent::PartnerDisconnected {
                        partner_id: client_id,
                    },
                ));
                self.enter_matching(client_id, Some(former), &mut outbound);
                self.enter_matching(former, Some(client_id), &mut outbound);
            }
            None => self.enter_matching(client_id, None, &mut outbound),
        }
        outbound
    }

    fn chat_message(&mut self, client_id: ClientId, message: String) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        let event = ServerEvent::ChatMessage {
            from: client_id,
            message,
        };

        match self.live_partner(client_id, &mut outbound) {
            Some(partner) => outbound.push(Outbound::To(partner, event)),
            None => match self.config.unpaired_chat {
                UnpairedChatPolicy::Echo => outbound.push(Outbound::To(client_id, event)),
                UnpairedChatPolicy::Broadcast => outbound.push(Outbound::Broadcast(event)),
            },
        }
        outbound
    }

    fn signal(
        &mut self,
        sender: ClientId,
        kind: SignalKind,
        target: ClientId,
        payload: Value,
    ) -> Vec<Outbound> {
        if !self.state.registry().exists(target) {
            debug!(?sender, error = %MatchError::NotFound(target), "Dropping signal");
            return Vec::new();
        }
        if self.config.signal_policy == SignalPolicy::PartnerOnly
            && self.state.registry().partner(sender) != Some(target)
        {
            warn!(?sender, ?target, ?kind, "Dropping signal to a client that is not the partner");
            return Vec::new();
        }

        debug!(?sender, ?target, ?kind, "Relaying signal");
        vec![Outbound::To(
            target,
            ServerEvent::Signal {
                kind,
                sender,
                payload,
            },
        )]
    }

    /// Returns the current partner, first resolving a stale pairing by putting the client
    /// back into matching (which may already yield a new partner).
    fn live_partner(&mut self, client_id: ClientId, outbound: &mut Vec<Outbound>) -> Option<ClientId> {
        if let Some(stale) = self.state.clear_stale_pairing(client_id) {
            outbound.push(Outbound::To(
                client_id,
                ServerEvent::PartnerDisconnected { partner_id: stale },
            ));
            self.enter_matching(client_id, None, outbound);
        }
        self.state.registry().partner(client_id)
    }

    fn enter_matching(
        &mut self,
        client_id: ClientId,
        avoid: Option<ClientId>,
        outbound: &mut Vec<Outbound>,
    ) {
        match self.state.attempt_match_avoiding(client_id, avoid) {
            Ok(Some(partner)) => {
                info!(?client_id, ?partner, "Partner found");
                outbound.push(Outbound::To(
                    client_id,
                    ServerEvent::PartnerFound {
                        partner_id: partner,
                        initiator: true,
                    },
                ));
                outbound.push(Outbound::To(
                    partner,
                    ServerEvent::PartnerFound {
                        partner_id: client_id,
                        initiator: false,
                    },
                ));
            }
            Ok(None) => outbound.push(Outbound::To(client_id, ServerEvent::Waiting)),
            Err(e) => error!(?client_id, error = %e, "Match attempt aborted"),
        }
    }
}
