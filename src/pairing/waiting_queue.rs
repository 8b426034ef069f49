use super::ClientRegistry;
use crate::model::ClientId;
use std::collections::{HashSet, VecDeque};

/// FIFO of clients looking for a partner.
///
/// Ids of clients that disconnected or got paired elsewhere may linger here until the next
/// scan; [`WaitingQueue::dequeue_first_eligible`] drops them as it walks past.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    order: VecDeque<ClientId>,
    members: HashSet<ClientId>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, id: ClientId) {
        if self.members.insert(id) {
            self.order.push_back(id);
        }
    }

    /// Removes and returns the earliest waiting client that is still registered, unpaired and
    /// not in `excluding`. Excluded clients keep their place.
    pub fn dequeue_first_eligible(
        &mut self,
        registry: &ClientRegistry,
        excluding: &[ClientId],
    ) -> Option<ClientId> {
        let mut index = 0;
        while index < self.order.len() {
            let id = self.order[index];
            if excluding.contains(&id) {
                index += 1;
                continue;
            }
            let eligible = registry.get(id).is_some_and(|record| !record.is_paired());
            self.order.remove(index);
            self.members.remove(&id);
            if eligible {
                return Some(id);
            }
        }
        None
    }

    pub fn remove(&mut self, id: ClientId) {
        if self.members.remove(&id) {
            self.order.retain(|&queued| queued != id);
        }
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.members.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[ClientId]) -> ClientRegistry {
        let mut registry = ClientRegistry::new();
        for &id in ids {
            registry.register(id).unwrap();
        }
        registry
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut queue = WaitingQueue::new();
        let id = ClientId::new_v4();
        queue.enqueue(id);
        queue.enqueue(id);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(id));
    }

    #[test]
    fn test_dequeue_in_insertion_order() {
        let a = ClientId::from_u128(1);
        let b = ClientId::from_u128(2);
        let registry = registry_with(&[a, b]);
        let mut queue = WaitingQueue::new();
        queue.enqueue(a);
        queue.enqueue(b);

        assert_eq!(queue.dequeue_first_eligible(&registry, &[]), Some(a));
        assert_eq!(queue.dequeue_first_eligible(&registry, &[]), Some(b));
        assert_eq!(queue.dequeue_first_eligible(&registry, &[]), None);
    }

    #[test]
    fn test_excluded_keeps_its_place() {
        let a = ClientId::from_u128(1);
        let b = ClientId::from_u128(2);
        let registry = registry_with(&[a, b]);
        let mut queue = WaitingQueue::new();
        queue.enqueue(a);
        queue.enqueue(b);

        assert_eq!(queue.dequeue_first_eligible(&registry, &[a]), Some(b));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_stale_ids_are_dropped() {
        let gone = ClientId::from_u128(1);
        let paired = ClientId::from_u128(2);
        let other = ClientId::from_u128(3);
        let waiting = ClientId::from_u128(4);
        let mut registry = registry_with(&[paired, other, waiting]);
        registry.set_partner(paired, Some(other)).unwrap();
        registry.set_partner(other, Some(paired)).unwrap();

        let mut queue = WaitingQueue::new();
        queue.enqueue(gone);
        queue.enqueue(paired);
        queue.enqueue(waiting);

        assert_eq!(queue.dequeue_first_eligible(&registry, &[]), Some(waiting));
        assert!(queue.is_empty());
        assert!(!queue.contains(gone));
        assert!(!queue.contains(paired));
    }

    #[test]
    fn test_remove() {
        let mut queue = WaitingQueue::new();
        let a = ClientId::from_u128(1);
        let b = ClientId::from_u128(2);
        queue.enqueue(a);
        queue.enqueue(b);
        queue.remove(a);
        queue.remove(ClientId::from_u128(9));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![b]);
        assert!(!queue.contains(a));
    }
}
