//! Target-room resolution
//!
//! Turns an announcement request into the ordered list of rooms to
//! announce to, applying the explicit-area > explicit-person > occupancy
//! priority and the configured fallbacks.

use crate::domain::types::{AnnouncementRequest, Person, PersonId, ResolvedTarget, Room};
use crate::infra::config::Config;
use crate::io::host::HostHandle;
use crate::services::occupancy::OccupancyAggregator;
use crate::services::presence::PresenceResolver;
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a request resolved to no announceable rooms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoTargetError {
    #[error("target area '{0}' is not configured")]
    UnconfiguredArea(String),
    #[error("target person '{0}' is not configured")]
    UnconfiguredPerson(String),
    #[error("no targeted person is currently home")]
    NobodyHome,
    #[error("no occupied rooms to announce to")]
    NothingOccupied,
}

#[derive(Clone)]
pub struct TargetResolver {
    config: Arc<Config>,
    presence: PresenceResolver,
    occupancy: OccupancyAggregator,
}

impl TargetResolver {
    pub fn new(config: Arc<Config>, host: HostHandle) -> Self {
        let presence = PresenceResolver::new(config.clone(), host.clone());
        let occupancy = OccupancyAggregator::new(config.clone(), host);
        Self { config, presence, occupancy }
    }

    /// Resolve the rooms an announcement should go to
    ///
    /// An `Ok(empty)` result means "nobody to tell": every targeted person
    /// is away. All other empty outcomes are reported as errors so the
    /// caller can surface a specific reason.
    pub fn resolve(
        &self,
        request: &AnnouncementRequest,
    ) -> Result<Vec<ResolvedTarget>, NoTargetError> {
        let tracking = request.room_tracking.unwrap_or(self.config.room_tracking());
        let verify =
            request.presence_verification.unwrap_or(self.config.presence_verification());

        if let Some(area) = request.target_area.as_deref() {
            let rooms = self.config.rooms_matching(area);
            if rooms.is_empty() {
                return Err(NoTargetError::UnconfiguredArea(area.to_string()));
            }
            return Ok(rooms.into_iter().map(|r| ResolvedTarget::room(r.id.clone())).collect());
        }

        if let Some(names) = request.target_person.as_deref() {
            return self.resolve_persons(names, tracking, verify);
        }

        if tracking || verify {
            let occupied = self.occupancy.occupied_rooms(tracking, verify);
            let targets: Vec<ResolvedTarget> = self
                .config
                .rooms()
                .iter()
                .filter(|r| occupied.contains(&r.id))
                .map(|r| ResolvedTarget::room(r.id.clone()))
                .collect();
            if targets.is_empty() {
                return Err(NoTargetError::NothingOccupied);
            }
            return Ok(targets);
        }

        // Both occupancy signals disabled: announce to every room with a
        // device attached, regardless of who is where.
        let targets = self.broadcast_targets();
        if targets.is_empty() {
            return Err(NoTargetError::NothingOccupied);
        }
        Ok(targets)
    }

    /// Resolve comma-separated person names into their rooms
    fn resolve_persons(
        &self,
        names: &str,
        tracking: bool,
        verify: bool,
    ) -> Result<Vec<ResolvedTarget>, NoTargetError> {
        let mut targeted: Vec<&Person> = Vec::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let person = self
                .config
                .match_person(name)
                .ok_or_else(|| NoTargetError::UnconfiguredPerson(name.to_string()))?;
            targeted.push(person);
        }

        // Merge targeted people into rooms, keeping resolution order
        let mut room_map: Vec<ResolvedTarget> = Vec::new();
        if tracking {
            for person in &targeted {
                let Some(room) = self.presence.resolve_room(person, verify) else {
                    continue;
                };
                match room_map.iter_mut().find(|t| t.room == room) {
                    Some(target) => target.persons.push(person.id.clone()),
                    None => {
                        room_map
                            .push(ResolvedTarget::with_persons(room, smallvec![person.id.clone()]));
                    }
                }
            }
        }

        if !room_map.is_empty() {
            return Ok(room_map);
        }

        // No one's room could be pinned down. If anyone is home, widen to
        // the occupied rooms; away people are nobody to tell.
        let home: SmallVec<[PersonId; 2]> = targeted
            .iter()
            .filter(|p| self.presence.is_home(p))
            .map(|p| p.id.clone())
            .collect();
        if home.is_empty() {
            debug!(target = %names, "no_targeted_person_home");
            return Ok(Vec::new());
        }

        let occupied = self.occupancy.occupied_rooms(tracking, verify);
        let rooms: Vec<&Room> = if occupied.is_empty() {
            self.config.rooms().iter().filter(|r| r.media_player.is_some()).collect()
        } else {
            self.config.rooms().iter().filter(|r| occupied.contains(&r.id)).collect()
        };

        Ok(rooms
            .into_iter()
            .map(|r| ResolvedTarget::with_persons(r.id.clone(), home.clone()))
            .collect())
    }

    fn broadcast_targets(&self) -> Vec<ResolvedTarget> {
        self.config
            .rooms()
            .iter()
            .filter(|r| r.media_player.is_some())
            .map(|r| ResolvedTarget::room(r.id.clone()))
            .collect()
    }
}
