//! Occupied-room aggregation
//!
//! Computes the set of currently occupied rooms from occupancy sensors,
//! tracked people, or both, and sizes groups per room.

use crate::domain::types::{Person, RoomId};
use crate::infra::config::Config;
use crate::io::host::HostHandle;
use crate::services::presence::PresenceResolver;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct OccupancyAggregator {
    config: Arc<Config>,
    presence: PresenceResolver,
}

impl OccupancyAggregator {
    pub fn new(config: Arc<Config>, host: HostHandle) -> Self {
        let presence = PresenceResolver::new(config.clone(), host);
        Self { config, presence }
    }

    /// Rooms currently considered occupied
    ///
    /// Union of sensor-occupied rooms (when `use_presence`) and rooms a
    /// tracked person resolves to (when `use_tracking`). Both flags off
    /// yields an empty set; the broadcast fallback is the target
    /// resolver's decision, not this one's.
    pub fn occupied_rooms(&self, use_tracking: bool, use_presence: bool) -> BTreeSet<RoomId> {
        let mut occupied = BTreeSet::new();

        if use_presence {
            for room in self.config.rooms() {
                if self.presence.sensors_active(room) {
                    debug!(room = %room.id, "room_occupied_by_sensor");
                    occupied.insert(room.id.clone());
                }
            }
        }

        if use_tracking {
            for person in self.config.people() {
                if let Some(room) = self.presence.resolve_room(person, use_presence) {
                    debug!(room = %room, person = %person.id, "room_occupied_by_tracking");
                    occupied.insert(room);
                }
            }
        }

        occupied
    }

    /// People whose tracked room is `room`, in configuration order
    pub fn people_in_room(&self, room: &RoomId, verify: bool) -> Vec<&Person> {
        self.config
            .people()
            .iter()
            .filter(|person| self.presence.resolve_room(person, verify).as_ref() == Some(room))
            .collect()
    }
}
