use uuid::Uuid;

pub type ClientId = Uuid;

/// Pairing state of one connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub partner_id: Option<ClientId>,
}

impl ClientRecord {
    pub fn new(id: ClientId) -> Self {
        ClientRecord {
            id,
            partner_id: None,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.partner_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_unpaired() {
        let record = ClientRecord::new(ClientId::new_v4());
        assert_eq!(record.partner_id, None);
        assert!(!record.is_paired());
    }
}
