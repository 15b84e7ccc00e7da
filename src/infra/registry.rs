//! Shared enable/mute registry
//!
//! Live enabled state for rooms and people, toggled by the host's switch
//! entities and consulted by the gate during dispatch. Anything without an
//! explicit entry counts as enabled. Each read/write is atomic; there is no
//! cross-room transaction.

use crate::domain::types::{PersonId, RoomId};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct EnableRegistry {
    people: RwLock<HashMap<PersonId, bool>>,
    rooms: RwLock<HashMap<RoomId, bool>>,
}

impl EnableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn person_enabled(&self, id: &PersonId) -> bool {
        self.people.read().get(id).copied().unwrap_or(true)
    }

    pub fn set_person_enabled(&self, id: PersonId, enabled: bool) {
        self.people.write().insert(id, enabled);
    }

    pub fn room_enabled(&self, id: &RoomId) -> bool {
        self.rooms.read().get(id).copied().unwrap_or(true)
    }

    pub fn set_room_enabled(&self, id: RoomId, enabled: bool) {
        self.rooms.write().insert(id, enabled);
    }
}
