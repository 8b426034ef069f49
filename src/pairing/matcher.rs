use super::{ClientRegistry, WaitingQueue};
use crate::model::{ClientId, MatchError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where a client currently sits in the pairing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Waiting,
    Paired(ClientId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingStats {
    pub connected: usize,
    pub waiting: usize,
    pub pairs: usize,
}

/// Registry and waiting queue, mutated together.
///
/// All pairing decisions go through this type so that a single owner (and a single lock
/// around it) serializes them.
#[derive(Debug, Default)]
pub struct PairingState {
    registry: ClientRegistry,
    queue: WaitingQueue,
}

impl PairingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &WaitingQueue {
        &self.queue
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut ClientRegistry {
        &mut self.registry
    }

    pub fn connect(&mut self, id: ClientId) -> Result<(), MatchError> {
        self.registry.register(id)
    }

    /// Drops the client from the queue and the registry. Returns the partner that was left
    /// behind, now unpaired.
    pub fn disconnect(&mut self, id: ClientId) -> Option<ClientId> {
        self.queue.remove(id);
        let partner = self.registry.unregister(id)?;
        if self.registry.partner(partner) != Some(id) {
            return None;
        }
        self.registry.set_partner(partner, None).ok()?;
        Some(partner)
    }

    pub fn attempt_match(&mut self, requester: ClientId) -> Result<Option<ClientId>, MatchError> {
        self.attempt_match_avoiding(requester, None)
    }

    /// Pairs `requester` with the earliest eligible waiting client other than itself.
    ///
    /// `avoid` is only a preference: it is passed over while anyone else is eligible and taken
    /// when it is the sole candidate. Without a candidate the requester is queued and `None` is
    /// returned.
    pub fn attempt_match_avoiding(
        &mut self,
        requester: ClientId,
        avoid: Option<ClientId>,
    ) -> Result<Option<ClientId>, MatchError> {
        let record = self
            .registry
            .get(requester)
            .ok_or(MatchError::NotFound(requester))?;
        if let Some(partner) = record.partner_id {
            return Err(MatchError::InvariantViolation(format!(
                "{requester} requested a match while paired with {partner}"
            )));
        }

        let preferred = match avoid {
            Some(avoid) => self
                .queue
                .dequeue_first_eligible(&self.registry, &[requester, avoid]),
            None => None,
        };
        let candidate = preferred
            .or_else(|| self.queue.dequeue_first_eligible(&self.registry, &[requester]));

        match candidate {
            Some(found) => {
                self.registry.set_partner(requester, Some(found))?;
                self.registry.set_partner(found, Some(requester))?;
                self.queue.remove(requester);
                self.queue.remove(found);
                debug!(?requester, ?found, "Paired clients");
                Ok(Some(found))
            }
            None => {
                self.queue.enqueue(requester);
                debug!(?requester, queue_len = self.queue.len(), "No partner available");
                Ok(None)
            }
        }
    }

    /// Clears both sides of the client's pairing and returns the former partner.
    pub fn unpair(&mut self, id: ClientId) -> Option<ClientId> {
        let partner = self.registry.partner(id)?;
        self.registry.set_partner(id, None).ok()?;
        if self.registry.partner(partner) != Some(id) {
            return None;
        }
        self.registry.set_partner(partner, None).ok()?;
        Some(partner)
    }

    /// Clears a one-sided pairing whose partner is gone or points elsewhere, returning the
    /// stale partner id.
    pub fn clear_stale_pairing(&mut self, id: ClientId) -> Option<ClientId> {
        let partner = self.registry.partner(id)?;
        if self.registry.partner(partner) == Some(id) {
            return None;
        }
        warn!(client_id = ?id, ?partner, "Clearing stale pairing");
        self.registry.set_partner(id, None).ok()?;
        Some(partner)
    }

    pub fn client_state(&self, id: ClientId) -> Option<ClientState> {
        let record = self.registry.get(id)?;
        Some(match record.partner_id {
            Some(partner) => ClientState::Paired(partner),
            None if self.queue.contains(id) => ClientState::Waiting,
            None => ClientState::Idle,
        })
    }

    pub fn stats(&self) -> PairingStats {
        let waiting = self
            .queue
            .iter()
            .filter(|&id| self.registry.get(id).is_some_and(|r| !r.is_paired()))
            .count();
        let paired = self
            .registry
            .records()
            .filter(|r| r.partner_id.is_some_and(|p| self.registry.partner(p) == Some(r.id)))
            .count();
        PairingStats {
            connected: self.registry.len(),
            waiting,
            pairs: paired / 2,
        }
    }

    /// Checks that every pairing is mutual and that no paired client sits in the queue.
    pub fn verify_invariants(&self) -> Result<(), MatchError> {
        for record in self.registry.records() {
            if let Some(partner) = record.partner_id {
                if partner == record.id {
                    return Err(MatchError::InvariantViolation(format!(
                        "{} is paired with itself",
                        record.id
                    )));
                }
                if self.registry.partner(partner) != Some(record.id) {
                    return Err(MatchError::InvariantViolation(format!(
                        "{} points at {} which does not point back",
                        record.id, partner
                    )));
                }
                if self.queue.contains(record.id) {
                    return Err(MatchError::InvariantViolation(format!(
                        "{} is paired but still waiting",
                        record.id
                    )));
                }
            }
        }
        Ok(())
    }
}
