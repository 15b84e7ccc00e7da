//! Announcement dispatch orchestration
//!
//! The dispatcher runs the full per-room sequence: gate checks, settings
//! selection, composition, optional pre-announce chime, TTS delivery, and
//! event emission. Rooms are independent; one room's block or failure
//! never prevents attempting the rest.


use crate::domain::types::{
    AnnouncementRequest, BlockReason, DeliveryOutcome, DispatchReport, Person, Room,
    ResolvedTarget, VoiceSettings,
};
use crate::infra::config::Config;
use crate::infra::registry::EnableRegistry;
use crate::io::host::{
    CapabilityCall, HostApi, HostHandle, CAP_MEDIA_PLAYER, CAP_PLAY_MEDIA, CAP_SPEAK, CAP_TTS,
    EVENT_ANNOUNCEMENT_BLOCKED, EVENT_ANNOUNCEMENT_SENT,
};
use crate::services::composer::{ComposeOverrides, MessageComposer};
use crate::services::gate::GateEvaluator;
use crate::services::occupancy::OccupancyAggregator;
use crate::services::targeting::{NoTargetError, TargetResolver};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Failure of a whole announce call
#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error(transparent)]
    NoTarget(#[from] NoTargetError),
    /// TTS delivery failed in at least one room; the report still carries
    /// every room's outcome, including successful deliveries
    #[error("TTS delivery failed in {failed} of {attempted} room(s)")]
    Delivery { failed: usize, attempted: usize, report: DispatchReport },
}

pub struct AnnouncementDispatcher {
    config: Arc<Config>,
    host: HostHandle,
    targeting: TargetResolver,
    occupancy: OccupancyAggregator,
    gate: GateEvaluator,
    composer: MessageComposer,
}

impl AnnouncementDispatcher {
    pub fn new(
        config: Arc<Config>,
        host_api: Arc<dyn HostApi>,
        registry: Arc<EnableRegistry>,
    ) -> Self {
        let host = HostHandle::new(host_api).with_timeout(config.capability_timeout());
        Self {
            targeting: TargetResolver::new(config.clone(), host.clone()),
            occupancy: OccupancyAggregator::new(config.clone(), host.clone()),
            gate: GateEvaluator::new(registry),
            composer: MessageComposer::new(config.clone(), host.clone()),
            config,
            host,
        }
    }

    /// Dispatch one announcement, returning after every target room was
    /// attempted
    pub async fn announce(
        &self,
        request: &AnnouncementRequest,
    ) -> Result<DispatchReport, AnnounceError> {
        let announcement_id = Uuid::now_v7().to_string();
        debug!(
            id = %announcement_id,
            message = %request.message,
            target_person = ?request.target_person,
            target_area = ?request.target_area,
            "announce_requested"
        );

        let targets = self.targeting.resolve(request)?;
        if targets.is_empty() {
            warn!(id = %announcement_id, "no_targeted_person_home");
            return Err(NoTargetError::NobodyHome.into());
        }

        let verify =
            request.presence_verification.unwrap_or(self.config.presence_verification());

        let mut report = DispatchReport::new(announcement_id);
        for target in &targets {
            let Some(room) = self.config.room(&target.room) else {
                continue;
            };
            let outcome =
                self.dispatch_to_room(&report.announcement_id, request, room, target, verify).await;
            debug!(room = %room.name, outcome = %outcome.as_str(), "room_dispatch_done");
            report.record(room.id.clone(), &room.name, outcome);
        }

        let failed = report.failed();
        if failed > 0 {
            error!(
                id = %report.announcement_id,
                failed = %failed,
                attempted = %report.rooms.len(),
                "announcement_delivery_failed"
            );
            return Err(AnnounceError::Delivery { failed, attempted: report.rooms.len(), report });
        }

        Ok(report)
    }

    /// Run the delivery pipeline for one room
    async fn dispatch_to_room(
        &self,
        announcement_id: &str,
        request: &AnnouncementRequest,
        room: &Room,
        target: &ResolvedTarget,
        verify: bool,
    ) -> DeliveryOutcome {
        let Some(media_player) = room.media_player.as_deref() else {
            debug!(room = %room.name, "no_media_player_configured");
            return DeliveryOutcome::Skipped;
        };

        if self.gate.is_room_blocked(&room.id) {
            info!(room = %room.name, "room_disabled_skipping");
            self.emit_blocked(announcement_id, room, &BlockReason::RoomDisabled);
            return DeliveryOutcome::Blocked(BlockReason::RoomDisabled);
        }

        // Person gate applies only to explicitly targeted deliveries. Muted
        // targets are dropped; the room aborts when no target remains.
        let mut targeted: Vec<&Person> =
            target.persons.iter().filter_map(|id| self.config.person(id)).collect();
        if !targeted.is_empty() {
            let mut remaining = Vec::with_capacity(targeted.len());
            let mut last_blocked = None;
            for person in targeted {
                if self.gate.is_person_blocked(&person.id) {
                    info!(person = %person.id, room = %room.name, "person_disabled_skipping");
                    let reason = BlockReason::PersonDisabled(person.id.clone());
                    self.emit_blocked(announcement_id, room, &reason);
                    last_blocked = Some(reason);
                } else {
                    remaining.push(person);
                }
            }
            if remaining.is_empty() {
                if let Some(reason) = last_blocked {
                    return DeliveryOutcome::Blocked(reason);
                }
            }
            targeted = remaining;
        }

        let occupants = self.occupancy.people_in_room(&room.id, verify);
        let overrides =
            ComposeOverrides { enhance: request.enhance_with_ai, translate: request.translate };
        let (text, settings) =
            self.composer.compose(&request.message, &targeted, &occupants, overrides).await;

        let pre_announce = request.pre_announce.unwrap_or(self.config.pre_announce_enabled());
        if pre_announce {
            self.play_chime(media_player).await;
        }

        if let Err(e) = self.call_tts(media_player, &text, &settings).await {
            error!(room = %room.name, error = %e, "tts_call_failed");
            return DeliveryOutcome::Failed { error: e.to_string() };
        }

        self.emit_sent(announcement_id, room, &text, &targeted);
        info!(room = %room.name, message = %text, "announcement_sent");
        DeliveryOutcome::Delivered { message: text }
    }

    /// Play the pre-announce chime, then hold so speech starts after the
    /// chime has finished
    async fn play_chime(&self, media_player: &str) {
        let url = self.config.pre_announce_url();
        if url.is_empty() {
            return;
        }

        let call = CapabilityCall::new(
            CAP_MEDIA_PLAYER,
            CAP_PLAY_MEDIA,
            json!({
                "entity_id": media_player,
                "media_content_id": url,
                "media_content_type": "music",
                "announce": true,
            }),
        )
        .blocking();

        match self.host.call_capability(call).await {
            Ok(_) => {
                let delay = self.config.pre_announce_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => warn!(media_player = %media_player, error = %e, "pre_announce_failed"),
        }
    }

    async fn call_tts(
        &self,
        media_player: &str,
        text: &str,
        settings: &VoiceSettings,
    ) -> anyhow::Result<()> {
        let engine = match settings.tts_engine.as_deref() {
            Some(engine) => engine,
            None => {
                warn!(media_player = %media_player, "no_tts_engine_configured");
                media_player
            }
        };

        let mut payload = json!({
            "entity_id": engine,
            "message": text,
            "cache": true,
            "media_player_entity_id": media_player,
        });
        let mut options = serde_json::Map::new();
        if let Some(voice) = settings.tts_voice.as_deref() {
            options.insert("voice".to_string(), Value::from(voice));
        }
        if let Some(code) = settings.language_code {
            options.insert("language".to_string(), Value::from(code));
        }
        if !options.is_empty() {
            payload["options"] = Value::Object(options);
        }

        let call = CapabilityCall::new(CAP_TTS, CAP_SPEAK, payload).blocking();
        self.host.call_capability(call).await.map(|_| ())
    }

    fn emit_sent(&self, announcement_id: &str, room: &Room, text: &str, targeted: &[&Person]) {
        let target_person: Value = if targeted.is_empty() {
            Value::Null
        } else {
            Value::from(
                targeted.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(","),
            )
        };
        self.host.emit_event(
            EVENT_ANNOUNCEMENT_SENT,
            json!({
                "announcement_id": announcement_id,
                "room": room.name,
                "message": text,
                "target_person": target_person,
            }),
        );
    }

    fn emit_blocked(&self, announcement_id: &str, room: &Room, reason: &BlockReason) {
        let person: Value = match reason {
            BlockReason::PersonDisabled(id) => Value::from(id.as_str()),
            BlockReason::RoomDisabled => Value::Null,
        };
        self.host.emit_event(
            EVENT_ANNOUNCEMENT_BLOCKED,
            json!({
                "announcement_id": announcement_id,
                "room": room.name,
                "reason": reason.as_str(),
                "target_person": person,
            }),
        );
    }
}
