//! Person-to-room resolution
//!
//! Resolves which room a tracked person currently occupies from their
//! home/away indicator and room-tracking signal, optionally cross-checked
//! against the room's occupancy sensors.

use crate::domain::types::{Person, Room, RoomId};
use crate::infra::config::Config;
use crate::io::host::{HostHandle, StateSnapshot};
use std::sync::Arc;
use tracing::debug;

/// Tracker state values that are never room names
const RESERVED_STATES: &[&str] = &["home", "not_home", "unknown", "unavailable", "none"];

#[derive(Clone)]
pub struct PresenceResolver {
    config: Arc<Config>,
    host: HostHandle,
}

impl PresenceResolver {
    pub fn new(config: Arc<Config>, host: HostHandle) -> Self {
        Self { config, host }
    }

    /// Whether the person's home/away indicator currently reads "home"
    pub fn is_home(&self, person: &Person) -> bool {
        self.host
            .get_state(person.id.as_str())
            .is_some_and(|state| state.value == "home")
    }

    /// Resolve the room a person currently occupies
    ///
    /// Returns `None` when the person is away, has no usable tracking
    /// signal, or (with `verify` set) the resolved room fails presence
    /// verification.
    pub fn resolve_room(&self, person: &Person, verify: bool) -> Option<RoomId> {
        if !self.is_home(person) {
            debug!(person = %person.id, "person_not_home");
            return None;
        }

        let tracker = person.tracker.as_deref()?;
        let Some(state) = self.host.get_state(tracker) else {
            debug!(person = %person.id, tracker = %tracker, "tracker_entity_missing");
            return None;
        };

        let room = self.room_from_signal(&state)?;

        if verify && !self.verify_presence(&room) {
            debug!(person = %person.id, room = %room, "presence_verification_failed");
            return None;
        }

        Some(room)
    }

    /// Interpret a tracking signal as a room reference
    ///
    /// Order: raw state value (skipping reserved home/away values), then
    /// the `area` attribute, then the `room` attribute.
    fn room_from_signal(&self, state: &StateSnapshot) -> Option<RoomId> {
        let value = state.value.to_lowercase();
        if !RESERVED_STATES.contains(&value.as_str()) {
            if let Some(room) = self.known_room(&value) {
                return Some(room);
            }
        }

        for key in ["area", "room"] {
            if let Some(attr) = state.attribute(key) {
                if let Some(room) = self.known_room(&attr.to_lowercase()) {
                    return Some(room);
                }
            }
        }

        None
    }

    fn known_room(&self, name: &str) -> Option<RoomId> {
        self.config
            .rooms()
            .iter()
            .find(|r| r.name.to_lowercase() == name || r.id.as_str().to_lowercase() == name)
            .map(|r| r.id.clone())
    }

    /// Confirm occupancy via the room's configured sensors
    ///
    /// A room with no sensors cannot be disconfirmed and counts as
    /// occupied; otherwise at least one sensor must read "on".
    pub fn verify_presence(&self, room: &RoomId) -> bool {
        let Some(room_config) = self.config.room(room) else {
            return true;
        };
        self.sensors_confirm(room_config)
    }

    pub(crate) fn sensors_confirm(&self, room: &Room) -> bool {
        if room.presence_sensors.is_empty() {
            return true;
        }
        room.presence_sensors
            .iter()
            .any(|sensor| self.host.get_state(sensor).is_some_and(|s| s.value == "on"))
    }

    /// Whether any of the room's sensors actively reports occupancy
    ///
    /// Unlike `verify_presence`, a sensorless room reports `false` here:
    /// this answers "is someone detected", not "can we rule someone out".
    pub(crate) fn sensors_active(&self, room: &Room) -> bool {
        room.presence_sensors
            .iter()
            .any(|sensor| self.host.get_state(sensor).is_some_and(|s| s.value == "on"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PersonId;
    use crate::io::MemoryHost;
    use std::sync::Arc;

    fn person(id: &str, tracker: Option<&str>) -> Person {
        Person {
            id: PersonId::from(id),
            name: "Test".to_string(),
            tracker: tracker.map(str::to_string),
            language: "english".to_string(),
            tts_engine: None,
            tts_voice: None,
            ai_agent: None,
            enhance: false,
            translate: false,
        }
    }

    fn room(id: &str, name: &str, sensors: &[&str]) -> Room {
        Room {
            id: RoomId::from(id),
            name: name.to_string(),
            media_player: Some(format!("media_player.{}", id)),
            presence_sensors: sensors.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn resolver_with(rooms: Vec<Room>) -> (PresenceResolver, Arc<MemoryHost>) {
        let config = Arc::new(Config::default().with_rooms(rooms));
        let host = Arc::new(MemoryHost::new());
        let handle = HostHandle::new(host.clone());
        (PresenceResolver::new(config, handle), host)
    }

    #[test]
    fn test_away_person_has_no_room() {
        let (resolver, host) = resolver_with(vec![room("kitchen", "Kitchen", &[])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("not_home"));
        host.set_state("sensor.mike_ble", StateSnapshot::new("kitchen"));

        assert!(!resolver.is_home(&mike));
        assert_eq!(resolver.resolve_room(&mike, false), None);
    }

    #[test]
    fn test_state_value_names_the_room() {
        let (resolver, host) = resolver_with(vec![room("kitchen", "Kitchen", &[])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state("sensor.mike_ble", StateSnapshot::new("Kitchen"));

        assert_eq!(resolver.resolve_room(&mike, false), Some(RoomId::from("kitchen")));
    }

    #[test]
    fn test_area_attribute_fallback() {
        let (resolver, host) = resolver_with(vec![room("kitchen", "Kitchen", &[])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state(
            "sensor.mike_ble",
            StateSnapshot::new("home").with_attribute("area", "kitchen"),
        );

        assert_eq!(resolver.resolve_room(&mike, false), Some(RoomId::from("kitchen")));
    }

    #[test]
    fn test_room_attribute_fallback() {
        let (resolver, host) = resolver_with(vec![room("kitchen", "Kitchen", &[])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state(
            "sensor.mike_ble",
            StateSnapshot::new("unknown").with_attribute("room", "Kitchen"),
        );

        assert_eq!(resolver.resolve_room(&mike, false), Some(RoomId::from("kitchen")));
    }

    #[test]
    fn test_reserved_values_are_not_rooms() {
        // A room actually named "Home" must not be matched via the reserved
        // raw state value
        let (resolver, host) = resolver_with(vec![room("home", "Home", &[])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state("sensor.mike_ble", StateSnapshot::new("home"));

        assert_eq!(resolver.resolve_room(&mike, false), None);
    }

    #[test]
    fn test_no_tracker_means_no_room() {
        let (resolver, host) = resolver_with(vec![room("kitchen", "Kitchen", &[])]);
        let mike = person("person.mike", None);

        host.set_state("person.mike", StateSnapshot::new("home"));

        assert_eq!(resolver.resolve_room(&mike, false), None);
        assert!(resolver.is_home(&mike));
    }

    #[test]
    fn test_verification_gate_dominates_tracking_signal() {
        let (resolver, host) =
            resolver_with(vec![room("kitchen", "Kitchen", &["binary_sensor.kitchen_motion"])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state("sensor.mike_ble", StateSnapshot::new("kitchen"));
        host.set_state("binary_sensor.kitchen_motion", StateSnapshot::new("off"));

        // Tracker says kitchen, but no sensor confirms it
        assert_eq!(resolver.resolve_room(&mike, true), None);
        // Without verification the tracker signal stands
        assert_eq!(resolver.resolve_room(&mike, false), Some(RoomId::from("kitchen")));
    }

    #[test]
    fn test_verification_passes_with_active_sensor() {
        let (resolver, host) =
            resolver_with(vec![room("kitchen", "Kitchen", &["binary_sensor.kitchen_motion"])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state("sensor.mike_ble", StateSnapshot::new("kitchen"));
        host.set_state("binary_sensor.kitchen_motion", StateSnapshot::new("on"));

        assert_eq!(resolver.resolve_room(&mike, true), Some(RoomId::from("kitchen")));
    }

    #[test]
    fn test_sensorless_room_cannot_be_disconfirmed() {
        let (resolver, host) = resolver_with(vec![room("kitchen", "Kitchen", &[])]);
        let mike = person("person.mike", Some("sensor.mike_ble"));

        host.set_state("person.mike", StateSnapshot::new("home"));
        host.set_state("sensor.mike_ble", StateSnapshot::new("kitchen"));

        assert!(resolver.verify_presence(&RoomId::from("kitchen")));
        assert_eq!(resolver.resolve_room(&mike, true), Some(RoomId::from("kitchen")));
    }
}
