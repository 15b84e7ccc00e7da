//! Per-room and per-person delivery gate
//!
//! Consults the shared enable/mute registry before a delivery. Emitting
//! the blocked event is the dispatcher's job; this only answers yes/no.

use crate::domain::types::{PersonId, RoomId};
use crate::infra::registry::EnableRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct GateEvaluator {
    registry: Arc<EnableRegistry>,
}

impl GateEvaluator {
    pub fn new(registry: Arc<EnableRegistry>) -> Self {
        Self { registry }
    }

    pub fn is_room_blocked(&self, room: &RoomId) -> bool {
        !self.registry.room_enabled(room)
    }

    pub fn is_person_blocked(&self, person: &PersonId) -> bool {
        !self.registry.person_enabled(person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unblocked_by_default() {
        let gate = GateEvaluator::new(Arc::new(EnableRegistry::new()));
        assert!(!gate.is_room_blocked(&RoomId::from("kitchen")));
        assert!(!gate.is_person_blocked(&PersonId::from("person.mike")));
    }

    #[test]
    fn test_follows_registry_state() {
        let registry = Arc::new(EnableRegistry::new());
        let gate = GateEvaluator::new(registry.clone());

        registry.set_room_enabled(RoomId::from("kitchen"), false);
        assert!(gate.is_room_blocked(&RoomId::from("kitchen")));

        registry.set_room_enabled(RoomId::from("kitchen"), true);
        assert!(!gate.is_room_blocked(&RoomId::from("kitchen")));

        registry.set_person_enabled(PersonId::from("person.mike"), false);
        assert!(gate.is_person_blocked(&PersonId::from("person.mike")));
    }
}
