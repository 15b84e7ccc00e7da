//! End-to-end announcement flow through a TOML config and scripted host

use roomcast::domain::types::AnnouncementRequest;
use roomcast::infra::{Config, EnableRegistry};
use roomcast::io::host::{EVENT_ANNOUNCEMENT_BLOCKED, EVENT_ANNOUNCEMENT_SENT};
use roomcast::io::{MemoryHost, StateSnapshot};
use roomcast::services::{AnnounceError, AnnouncementDispatcher, NoTargetError};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[global]
room_tracking = true
presence_verification = false
default_tts_engine = "tts.cloud"
default_ai_agent = "conversation.home_llm"

[pre_announce]
enabled = true
url = "/local/sounds/chime.mp3"
delay_secs = 0

[group]
addressee = "Everyone"
language = "english"

[[people]]
id = "person.mike"
name = "Mike"
tracker = "sensor.mike_ble"
language = "english"

[[people]]
id = "person.anna"
name = "Anna"
tracker = "sensor.anna_ble"
language = "french"
translate = true

[[rooms]]
id = "kitchen"
name = "Kitchen"
media_player = "media_player.kitchen"

[[rooms]]
id = "living_room"
name = "Living Room"
media_player = "media_player.living_room"

[[rooms]]
id = "hallway"
name = "Hallway"
"#;

struct Fixture {
    dispatcher: AnnouncementDispatcher,
    host: Arc<MemoryHost>,
    registry: Arc<EnableRegistry>,
}

fn fixture() -> Fixture {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(CONFIG.as_bytes()).unwrap();
    let config = Arc::new(Config::from_file(temp_file.path()).unwrap());

    let host = Arc::new(MemoryHost::new());
    let registry = Arc::new(EnableRegistry::new());
    let dispatcher = AnnouncementDispatcher::new(config, host.clone(), registry.clone());
    Fixture { dispatcher, host, registry }
}

fn seed_home(host: &MemoryHost, person: &str, tracker: &str, room: &str) {
    host.set_state(person, StateSnapshot::new("home"));
    host.set_state(tracker, StateSnapshot::new(room));
}

#[tokio::test]
async fn test_two_person_dispatch_is_room_isolated() {
    let f = fixture();
    seed_home(&f.host, "person.mike", "sensor.mike_ble", "kitchen");
    seed_home(&f.host, "person.anna", "sensor.anna_ble", "living_room");

    let request = AnnouncementRequest::new("Time for dinner")
        .with_target_person("Mike,Anna")
        .with_pre_announce(false);
    let report = f.dispatcher.announce(&request).await.unwrap();

    assert_eq!(report.rooms.len(), 2);
    assert_eq!(report.delivered(), 2);

    // Each room carries only its own targeted person
    let sent = f.host.events_named(EVENT_ANNOUNCEMENT_SENT);
    assert_eq!(sent.len(), 2);
    let kitchen = sent.iter().find(|e| e["room"] == "Kitchen").unwrap();
    assert_eq!(kitchen["target_person"], "person.mike");
    assert_eq!(kitchen["message"], "Mike, Time for dinner");
    let living = sent.iter().find(|e| e["room"] == "Living Room").unwrap();
    assert_eq!(living["target_person"], "person.anna");

    // Anna's per-person translation went through the AI agent
    let ai_calls = f.host.calls_for("conversation.process");
    assert_eq!(ai_calls.len(), 1);
    let prompt = ai_calls[0].payload["text"].as_str().unwrap();
    assert!(prompt.contains("french"));
}

#[tokio::test]
async fn test_chime_precedes_speech_per_room() {
    let f = fixture();
    seed_home(&f.host, "person.mike", "sensor.mike_ble", "kitchen");

    let request = AnnouncementRequest::new("package at the door").with_target_area("Kitchen");
    f.dispatcher.announce(&request).await.unwrap();

    let names: Vec<String> = f.host.calls().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["media_player.play_media", "tts.speak"]);
}

#[tokio::test]
async fn test_room_mute_blocks_and_reports() {
    let f = fixture();
    seed_home(&f.host, "person.mike", "sensor.mike_ble", "kitchen");
    f.registry.set_room_enabled("kitchen".into(), false);

    let request = AnnouncementRequest::new("dinner").with_target_person("Mike");
    let report = f.dispatcher.announce(&request).await.unwrap();

    assert_eq!(report.delivered(), 0);
    assert!(f.host.calls_for("tts.speak").is_empty());
    let blocked = f.host.events_named(EVENT_ANNOUNCEMENT_BLOCKED);
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0]["reason"], "room_disabled");
}

#[tokio::test]
async fn test_nobody_home_error_reaches_caller() {
    let f = fixture();
    f.host.set_state("person.mike", StateSnapshot::new("not_home"));

    let request = AnnouncementRequest::new("dinner").with_target_person("Mike");
    let err = f.dispatcher.announce(&request).await.unwrap_err();
    assert!(matches!(err, AnnounceError::NoTarget(NoTargetError::NobodyHome)));
}

#[tokio::test]
async fn test_unconfigured_area_error_reaches_caller() {
    let f = fixture();

    let request = AnnouncementRequest::new("dinner").with_target_area("Attic");
    let err = f.dispatcher.announce(&request).await.unwrap_err();
    assert!(matches!(
        err,
        AnnounceError::NoTarget(NoTargetError::UnconfiguredArea(area)) if area == "Attic"
    ));
}

#[tokio::test]
async fn test_tts_failure_is_isolated_and_reraised() {
    let f = fixture();
    seed_home(&f.host, "person.mike", "sensor.mike_ble", "kitchen");
    seed_home(&f.host, "person.anna", "sensor.anna_ble", "living_room");
    f.host.fail_capability_for("tts.speak", "tts.cloud");

    // Both rooms share the engine entity, so everything fails
    let request = AnnouncementRequest::new("Time for dinner")
        .with_target_person("Mike,Anna")
        .with_pre_announce(false);
    let err = f.dispatcher.announce(&request).await.unwrap_err();

    let AnnounceError::Delivery { failed, attempted, report } = err else {
        panic!("expected delivery error");
    };
    assert_eq!(failed, 2);
    assert_eq!(attempted, 2);
    // Both rooms were attempted despite the first failure
    assert_eq!(f.host.calls_for("tts.speak").len(), 2);
    assert_eq!(report.rooms.len(), 2);
}
