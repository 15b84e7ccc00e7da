//! Shared types for the announcement router

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::domain::language;

/// Newtype wrapper for person identifiers to provide type safety
///
/// The identifier doubles as the host entity reference for the person's
/// home/away indicator (e.g. `person.mike`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier part after the last `.` (e.g. `person.anna_marie` -> `anna_marie`)
    pub fn suffix(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, suffix)| suffix)
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Newtype wrapper for room (area) identifiers to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A tracked occupant with per-person voice and AI preferences
///
/// Created at configuration load, immutable during a single announcement.
#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub id: PersonId,
    /// Friendly name used for personalization
    pub name: String,
    /// Room-tracking signal entity (e.g. a BLE room tracker); absent means
    /// the person can only be resolved as home/away
    #[serde(default)]
    pub tracker: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tts_engine: Option<String>,
    #[serde(default)]
    pub tts_voice: Option<String>,
    #[serde(default)]
    pub ai_agent: Option<String>,
    /// Rephrase announcements through the AI agent
    #[serde(default)]
    pub enhance: bool,
    /// Translate announcements to the person's language
    #[serde(default)]
    pub translate: bool,
}

fn default_language() -> String {
    "english".to_string()
}

/// A named physical space with an announcement device and occupancy sensors
#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Speaker entity announcements play on; a room without one is
    /// unannounceable and silently skipped
    #[serde(default)]
    pub media_player: Option<String>,
    #[serde(default)]
    pub presence_sensors: Vec<String>,
}

/// Fallback settings used when a room holds 2+ people and no one specific
/// is targeted
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    pub addressee: String,
    pub language: String,
    pub tts_engine: Option<String>,
    pub tts_voice: Option<String>,
    pub ai_agent: Option<String>,
    pub enhance: bool,
    pub translate: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            addressee: "Everyone".to_string(),
            language: default_language(),
            tts_engine: None,
            tts_voice: None,
            ai_agent: None,
            enhance: false,
            translate: false,
        }
    }
}

/// One incoming announce call, discarded after dispatch completes
#[derive(Debug, Clone, Default)]
pub struct AnnouncementRequest {
    pub message: String,
    /// Comma-separated person names, resolved against configuration
    pub target_person: Option<String>,
    /// Room name or id
    pub target_area: Option<String>,
    pub enhance_with_ai: Option<bool>,
    pub translate: Option<bool>,
    pub pre_announce: Option<bool>,
    pub room_tracking: Option<bool>,
    pub presence_verification: Option<bool>,
}

impl AnnouncementRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Default::default() }
    }

    pub fn with_target_person(mut self, names: impl Into<String>) -> Self {
        self.target_person = Some(names.into());
        self
    }

    pub fn with_target_area(mut self, area: impl Into<String>) -> Self {
        self.target_area = Some(area.into());
        self
    }

    pub fn with_enhance(mut self, enhance: bool) -> Self {
        self.enhance_with_ai = Some(enhance);
        self
    }

    pub fn with_translate(mut self, translate: bool) -> Self {
        self.translate = Some(translate);
        self
    }

    pub fn with_pre_announce(mut self, pre_announce: bool) -> Self {
        self.pre_announce = Some(pre_announce);
        self
    }

    pub fn with_room_tracking(mut self, tracking: bool) -> Self {
        self.room_tracking = Some(tracking);
        self
    }

    pub fn with_presence_verification(mut self, verification: bool) -> Self {
        self.presence_verification = Some(verification);
        self
    }
}

/// A room to announce to, plus the targeted people relevant to it
///
/// An empty person list means "whoever is in the room".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub room: RoomId,
    pub persons: SmallVec<[PersonId; 2]>,
}

impl ResolvedTarget {
    pub fn room(room: RoomId) -> Self {
        Self { room, persons: SmallVec::new() }
    }

    pub fn with_persons(room: RoomId, persons: SmallVec<[PersonId; 2]>) -> Self {
        Self { room, persons }
    }
}

/// Resolved voice and AI settings for one room delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSettings {
    pub language: String,
    /// TTS language code for the language, when known (e.g. `es`)
    pub language_code: Option<&'static str>,
    pub tts_engine: Option<String>,
    pub tts_voice: Option<String>,
    pub ai_agent: Option<String>,
    pub enhance: bool,
    pub translate: bool,
}

impl VoiceSettings {
    /// Build settings from one person's preferences, falling back to the
    /// configured default engine/agent for unset fields
    pub fn for_person(
        person: &Person,
        default_engine: Option<&str>,
        default_agent: Option<&str>,
    ) -> Self {
        Self {
            language_code: language::language_code(&person.language),
            language: person.language.clone(),
            tts_engine: person.tts_engine.clone().or_else(|| default_engine.map(str::to_string)),
            tts_voice: person.tts_voice.clone(),
            ai_agent: person.ai_agent.clone().or_else(|| default_agent.map(str::to_string)),
            enhance: person.enhance,
            translate: person.translate,
        }
    }

    /// Build settings from the group fallback
    pub fn for_group(
        group: &GroupSettings,
        default_engine: Option<&str>,
        default_agent: Option<&str>,
    ) -> Self {
        Self {
            language_code: language::language_code(&group.language),
            language: group.language.clone(),
            tts_engine: group.tts_engine.clone().or_else(|| default_engine.map(str::to_string)),
            tts_voice: group.tts_voice.clone(),
            ai_agent: group.ai_agent.clone().or_else(|| default_agent.map(str::to_string)),
            enhance: group.enhance,
            translate: group.translate,
        }
    }
}

/// Why a room delivery was blocked at the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    RoomDisabled,
    PersonDisabled(PersonId),
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::RoomDisabled => "room_disabled",
            BlockReason::PersonDisabled(_) => "person_disabled",
        }
    }
}

/// Terminal state of one room in one announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Room has no configured media player
    Skipped,
    /// Gate check rejected the delivery
    Blocked(BlockReason),
    /// TTS call issued with the final message text
    Delivered { message: String },
    /// TTS call failed; other rooms are unaffected
    Failed { error: String },
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Skipped => "skipped",
            DeliveryOutcome::Blocked(_) => "blocked",
            DeliveryOutcome::Delivered { .. } => "delivered",
            DeliveryOutcome::Failed { .. } => "failed",
        }
    }
}

/// Per-room result of one dispatched announcement
#[derive(Debug, Clone)]
pub struct RoomDispatch {
    pub room: RoomId,
    pub room_name: String,
    pub outcome: DeliveryOutcome,
}

/// Aggregated result of one announce call, one entry per attempted room
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// UUIDv7 stamped on every event this announcement fires
    pub announcement_id: String,
    pub rooms: Vec<RoomDispatch>,
}

impl DispatchReport {
    pub fn new(announcement_id: String) -> Self {
        Self { announcement_id, rooms: Vec::new() }
    }

    pub fn record(&mut self, room: RoomId, room_name: &str, outcome: DeliveryOutcome) {
        self.rooms.push(RoomDispatch { room, room_name: room_name.to_string(), outcome });
    }

    pub fn delivered(&self) -> usize {
        self.rooms
            .iter()
            .filter(|r| matches!(r.outcome, DeliveryOutcome::Delivered { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rooms.iter().filter(|r| matches!(r.outcome, DeliveryOutcome::Failed { .. })).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_id_suffix() {
        assert_eq!(PersonId::from("person.mike").suffix(), "mike");
        assert_eq!(PersonId::from("person.anna_marie").suffix(), "anna_marie");
        assert_eq!(PersonId::from("mike").suffix(), "mike");
    }

    #[test]
    fn test_block_reason_as_str() {
        assert_eq!(BlockReason::RoomDisabled.as_str(), "room_disabled");
        assert_eq!(BlockReason::PersonDisabled(PersonId::from("person.mike")).as_str(), "person_disabled");
    }

    #[test]
    fn test_report_counts() {
        let mut report = DispatchReport::new("test".to_string());
        report.record(RoomId::from("kitchen"), "Kitchen", DeliveryOutcome::Delivered {
            message: "hi".to_string(),
        });
        report.record(RoomId::from("attic"), "Attic", DeliveryOutcome::Skipped);
        report.record(RoomId::from("garage"), "Garage", DeliveryOutcome::Failed {
            error: "speaker offline".to_string(),
        });

        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.rooms.len(), 3);
    }

    #[test]
    fn test_group_settings_defaults() {
        let group = GroupSettings::default();
        assert_eq!(group.addressee, "Everyone");
        assert_eq!(group.language, "english");
        assert!(!group.enhance);
        assert!(!group.translate);
    }

    #[test]
    fn test_voice_settings_default_fallbacks() {
        let person = Person {
            id: PersonId::from("person.mike"),
            name: "Mike".to_string(),
            tracker: None,
            language: "spanish".to_string(),
            tts_engine: None,
            tts_voice: Some("miguel".to_string()),
            ai_agent: None,
            enhance: true,
            translate: false,
        };

        let settings =
            VoiceSettings::for_person(&person, Some("tts.cloud"), Some("conversation.llm"));
        assert_eq!(settings.language, "spanish");
        assert_eq!(settings.language_code, Some("es"));
        assert_eq!(settings.tts_engine.as_deref(), Some("tts.cloud"));
        assert_eq!(settings.tts_voice.as_deref(), Some("miguel"));
        assert_eq!(settings.ai_agent.as_deref(), Some("conversation.llm"));
        assert!(settings.enhance);
    }
}
