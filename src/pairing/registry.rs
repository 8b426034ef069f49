use crate::model::{ClientId, ClientRecord, MatchError};
use std::collections::HashMap;

/// Every currently connected client and its partner.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientRecord>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ClientId) -> Result<(), MatchError> {
        if self.clients.contains_key(&id) {
            return Err(MatchError::AlreadyRegistered(id));
        }
        self.clients.insert(id, ClientRecord::new(id));
        Ok(())
    }

    /// Removes the record and returns the partner it held, if any.
    pub fn unregister(&mut self, id: ClientId) -> Option<ClientId> {
        self.clients.remove(&id).and_then(|record| record.partner_id)
    }

    pub fn partner(&self, id: ClientId) -> Option<ClientId> {
        self.clients.get(&id).and_then(|record| record.partner_id)
    }

    pub fn set_partner(&mut self, id: ClientId, partner: Option<ClientId>) -> Result<(), MatchError> {
        match self.clients.get_mut(&id) {
            Some(record) => {
                record.partner_id = partner;
                Ok(())
            }
            None => Err(MatchError::NotFound(id)),
        }
    }

    pub fn exists(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&ClientRecord> {
        self.clients.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = &ClientRecord> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
