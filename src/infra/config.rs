//! Configuration loading from TOML files
//!
//! Two-stage loading: the raw `TomlConfig` is deserialized with serde
//! defaults, then validated once into `Config`. Per-call code never
//! re-validates; lookups go through the helpers on `Config`.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::language;
use crate::domain::types::{GroupSettings, Person, PersonId, Room, RoomId};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Route announcements by tracked person location
    pub room_tracking: bool,
    /// Require an active occupancy sensor to confirm a tracked room
    pub presence_verification: bool,
    pub debug_mode: bool,
    /// TTS engine entity used when a person/group sets none
    pub default_tts_engine: Option<String>,
    /// AI agent entity used when a person/group sets none
    pub default_ai_agent: Option<String>,
    /// Timeout applied to every capability call; absent means wait forever
    pub capability_timeout_secs: Option<u64>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            room_tracking: true,
            presence_verification: false,
            debug_mode: false,
            default_tts_engine: None,
            default_ai_agent: None,
            capability_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreAnnounceConfig {
    pub enabled: bool,
    /// Chime media url; empty disables the chime entirely
    pub url: String,
    /// Settle delay after the chime so speech does not talk over it
    pub delay_secs: u64,
}

impl Default for PreAnnounceConfig {
    fn default() -> Self {
        Self { enabled: true, url: "/local/sounds/chime.mp3".to_string(), delay_secs: 2 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub translate: String,
    pub enhance: String,
    pub both: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            translate: "Translate this announcement to {language}. Return only the translated \
                        announcement, no explanations or confirmations. Keep who it's addressed \
                        to. Message: \"{message}\""
                .to_string(),
            enhance: "Rephrase this announcement to be more engaging. Return only the new \
                      announcement, no explanations or confirmations. Keep who it's addressed \
                      to. Message: \"{message}\""
                .to_string(),
            both: "Translate this announcement to {language} and make it more engaging. Return \
                   only the result, no explanations or confirmations. Keep who it's addressed \
                   to. Message: \"{message}\""
                .to_string(),
        }
    }
}

/// Raw TOML document shape
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub pre_announce: PreAnnounceConfig,
    #[serde(default)]
    pub group: GroupSettings,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    people: Vec<Person>,
    rooms: Vec<Room>,
    group: GroupSettings,
    room_tracking: bool,
    presence_verification: bool,
    debug_mode: bool,
    default_tts_engine: Option<String>,
    default_ai_agent: Option<String>,
    capability_timeout: Option<Duration>,
    pre_announce_enabled: bool,
    pre_announce_url: String,
    pre_announce_delay: Duration,
    prompt_translate: String,
    prompt_enhance: String,
    prompt_both: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        let global = GlobalConfig::default();
        let pre_announce = PreAnnounceConfig::default();
        let prompts = PromptsConfig::default();
        Self {
            people: Vec::new(),
            rooms: Vec::new(),
            group: GroupSettings::default(),
            room_tracking: global.room_tracking,
            presence_verification: global.presence_verification,
            debug_mode: global.debug_mode,
            default_tts_engine: global.default_tts_engine,
            default_ai_agent: global.default_ai_agent,
            capability_timeout: global.capability_timeout_secs.map(Duration::from_secs),
            pre_announce_enabled: pre_announce.enabled,
            pre_announce_url: pre_announce.url,
            pre_announce_delay: Duration::from_secs(pre_announce.delay_secs),
            prompt_translate: prompts.translate,
            prompt_enhance: prompts.enhance,
            prompt_both: prompts.both,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Validate a raw TOML document into a usable configuration
    fn from_toml(toml_config: TomlConfig, origin: &str) -> anyhow::Result<Self> {
        let mut person_ids: HashSet<&str> = HashSet::new();
        for person in &toml_config.people {
            if person.id.as_str().is_empty() {
                bail!("person with empty id");
            }
            if person.name.trim().is_empty() {
                bail!("person '{}' has an empty name", person.id);
            }
            if !person_ids.insert(person.id.as_str()) {
                bail!("duplicate person id '{}'", person.id);
            }
            if !language::is_supported(&person.language) {
                bail!("person '{}' has unsupported language '{}'", person.id, person.language);
            }
        }

        let mut room_ids: HashSet<&str> = HashSet::new();
        for room in &toml_config.rooms {
            if room.id.as_str().is_empty() {
                bail!("room with empty id");
            }
            if room.name.trim().is_empty() {
                bail!("room '{}' has an empty name", room.id);
            }
            if !room_ids.insert(room.id.as_str()) {
                bail!("duplicate room id '{}'", room.id);
            }
        }

        if !language::is_supported(&toml_config.group.language) {
            bail!("group settings have unsupported language '{}'", toml_config.group.language);
        }

        Ok(Self {
            people: toml_config.people,
            rooms: toml_config.rooms,
            group: toml_config.group,
            room_tracking: toml_config.global.room_tracking,
            presence_verification: toml_config.global.presence_verification,
            debug_mode: toml_config.global.debug_mode,
            default_tts_engine: toml_config.global.default_tts_engine,
            default_ai_agent: toml_config.global.default_ai_agent,
            capability_timeout: toml_config
                .global
                .capability_timeout_secs
                .map(Duration::from_secs),
            pre_announce_enabled: toml_config.pre_announce.enabled,
            pre_announce_url: toml_config.pre_announce.url,
            pre_announce_delay: Duration::from_secs(toml_config.pre_announce.delay_secs),
            prompt_translate: toml_config.prompts.translate,
            prompt_enhance: toml_config.prompts.enhance,
            prompt_both: toml_config.prompts.both,
            config_file: origin.to_string(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Self::from_toml(toml_config, &path.display().to_string())
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn group(&self) -> &GroupSettings {
        &self.group
    }

    pub fn room_tracking(&self) -> bool {
        self.room_tracking
    }

    pub fn presence_verification(&self) -> bool {
        self.presence_verification
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn default_tts_engine(&self) -> Option<&str> {
        self.default_tts_engine.as_deref()
    }

    pub fn default_ai_agent(&self) -> Option<&str> {
        self.default_ai_agent.as_deref()
    }

    pub fn capability_timeout(&self) -> Option<Duration> {
        self.capability_timeout
    }

    pub fn pre_announce_enabled(&self) -> bool {
        self.pre_announce_enabled
    }

    pub fn pre_announce_url(&self) -> &str {
        &self.pre_announce_url
    }

    pub fn pre_announce_delay(&self) -> Duration {
        self.pre_announce_delay
    }

    pub fn prompt_translate(&self) -> &str {
        &self.prompt_translate
    }

    pub fn prompt_enhance(&self) -> &str {
        &self.prompt_enhance
    }

    pub fn prompt_both(&self) -> &str {
        &self.prompt_both
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Look up a person by exact id
    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.people.iter().find(|p| &p.id == id)
    }

    /// Look up a room by exact id
    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    /// All rooms matching an area string case-insensitively by id or name
    pub fn rooms_matching(&self, area: &str) -> Vec<&Room> {
        let needle = area.trim().to_lowercase();
        self.rooms
            .iter()
            .filter(|r| {
                r.id.as_str().to_lowercase() == needle || r.name.to_lowercase() == needle
            })
            .collect()
    }

    /// Resolve a person by spoken name, case-insensitively
    ///
    /// Matching tries, in order: exact friendly name, raw identifier suffix,
    /// suffix with underscores replaced by spaces. First match wins.
    pub fn match_person(&self, name: &str) -> Option<&Person> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.people
            .iter()
            .find(|p| p.name.to_lowercase() == needle)
            .or_else(|| self.people.iter().find(|p| p.id.suffix().to_lowercase() == needle))
            .or_else(|| {
                self.people
                    .iter()
                    .find(|p| p.id.suffix().to_lowercase().replace('_', " ") == needle)
            })
    }

    /// Builder method for tests to add people
    #[cfg(test)]
    pub fn with_people(mut self, people: Vec<Person>) -> Self {
        self.people = people;
        self
    }

    /// Builder method for tests to add rooms
    #[cfg(test)]
    pub fn with_rooms(mut self, rooms: Vec<Room>) -> Self {
        self.rooms = rooms;
        self
    }

    /// Builder method for tests to replace group settings
    #[cfg(test)]
    pub fn with_group(mut self, group: GroupSettings) -> Self {
        self.group = group;
        self
    }

    /// Builder method for tests to set the routing toggles
    #[cfg(test)]
    pub fn with_toggles(mut self, room_tracking: bool, presence_verification: bool) -> Self {
        self.room_tracking = room_tracking;
        self.presence_verification = presence_verification;
        self
    }

    /// Builder method for tests to set the default TTS engine and AI agent
    #[cfg(test)]
    pub fn with_defaults(
        mut self,
        tts_engine: Option<&str>,
        ai_agent: Option<&str>,
    ) -> Self {
        self.default_tts_engine = tts_engine.map(str::to_string);
        self.default_ai_agent = ai_agent.map(str::to_string);
        self
    }

    /// Builder method for tests to configure the pre-announce chime
    #[cfg(test)]
    pub fn with_pre_announce(mut self, enabled: bool, url: &str, delay_secs: u64) -> Self {
        self.pre_announce_enabled = enabled;
        self.pre_announce_url = url.to_string();
        self.pre_announce_delay = Duration::from_secs(delay_secs);
        self
    }

    /// Builder method for tests to set the capability-call timeout
    #[cfg(test)]
    pub fn with_capability_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.capability_timeout = timeout;
        self
    }
}
