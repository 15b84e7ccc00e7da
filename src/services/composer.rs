//! Message composition
//!
//! Selects voice/AI settings for a delivery, personalizes the message
//! with the addressee's name, and optionally runs it through the AI
//! capability for rephrasing and/or translation. Settings selection lives
//! here and only here; every call site goes through `select_settings`.

use crate::domain::types::{Person, VoiceSettings};
use crate::infra::config::Config;
use crate::io::host::{CapabilityCall, HostHandle, CAP_CONVERSATION, CAP_PROCESS};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const NAME_PLACEHOLDERS: [&str; 2] = ["{{ name }}", "{{name}}"];

/// Per-call overrides for the AI flags, from the announce request
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOverrides {
    pub enhance: Option<bool>,
    pub translate: Option<bool>,
}

#[derive(Clone)]
pub struct MessageComposer {
    config: Arc<Config>,
    host: HostHandle,
}

impl MessageComposer {
    pub fn new(config: Arc<Config>, host: HostHandle) -> Self {
        Self { config, host }
    }

    /// Resolve voice/AI settings for one room delivery
    ///
    /// Priority: a single explicitly targeted person's own settings; group
    /// settings when several people are targeted or the room holds 2+
    /// occupants; the sole occupant's settings; group settings as the
    /// final fallback for an empty or unknown room.
    pub fn select_settings(&self, targets: &[&Person], occupants: &[&Person]) -> VoiceSettings {
        let default_engine = self.config.default_tts_engine();
        let default_agent = self.config.default_ai_agent();

        match (targets, occupants) {
            ([person], _) => VoiceSettings::for_person(person, default_engine, default_agent),
            ([_, ..], _) => {
                VoiceSettings::for_group(self.config.group(), default_engine, default_agent)
            }
            ([], [person]) => VoiceSettings::for_person(person, default_engine, default_agent),
            ([], _) => {
                VoiceSettings::for_group(self.config.group(), default_engine, default_agent)
            }
        }
    }

    /// Resolve the name the message addresses, if any
    fn resolve_name(&self, targets: &[&Person], occupants: &[&Person]) -> Option<String> {
        match (targets, occupants) {
            ([person], _) => Some(person.name.clone()),
            ([_, ..], _) => Some(self.config.group().addressee.clone()),
            ([], occupants) if occupants.len() >= 2 => {
                Some(self.config.group().addressee.clone())
            }
            ([], [person]) => Some(person.name.clone()),
            _ => None,
        }
    }

    /// Substitute or prepend the addressee name
    fn personalize(&self, message: &str, name: Option<&str>) -> String {
        if NAME_PLACEHOLDERS.iter().any(|p| message.contains(p)) {
            // Placeholders never leak: an unresolved name falls back to the
            // group addressee
            let name = name.unwrap_or(self.config.group().addressee.as_str());
            let mut personalized = message.to_string();
            for placeholder in NAME_PLACEHOLDERS {
                personalized = personalized.replace(placeholder, name);
            }
            return personalized;
        }

        match name {
            Some(name) => format!("{}, {}", name, message),
            None => message.to_string(),
        }
    }

    /// Run the personalized text through the AI capability
    ///
    /// Any failure degrades to the input text; AI is best-effort by
    /// definition here.
    async fn enhance_text(&self, message: &str, settings: &VoiceSettings) -> String {
        let Some(agent) = settings.ai_agent.as_deref() else {
            debug!("no_ai_agent_configured");
            return message.to_string();
        };

        let template = match (settings.enhance, settings.translate) {
            (true, true) => self.config.prompt_both(),
            (true, false) => self.config.prompt_enhance(),
            (false, true) => self.config.prompt_translate(),
            (false, false) => return message.to_string(),
        };
        let prompt =
            template.replace("{language}", &settings.language).replace("{message}", message);

        let call = CapabilityCall::new(
            CAP_CONVERSATION,
            CAP_PROCESS,
            json!({"agent_id": agent, "text": prompt}),
        )
        .blocking();

        match self.host.call_capability(call).await {
            Ok(Some(response)) => {
                match response.pointer("/response/speech/plain/speech").and_then(Value::as_str) {
                    Some(text) if !text.trim().is_empty() => {
                        debug!(from = %message, to = %text, "ai_rewrote_message");
                        text.to_string()
                    }
                    _ => {
                        warn!(agent = %agent, "ai_response_missing_speech");
                        message.to_string()
                    }
                }
            }
            Ok(None) => {
                warn!(agent = %agent, "ai_response_empty");
                message.to_string()
            }
            Err(e) => {
                warn!(agent = %agent, error = %e, "ai_enhancement_failed");
                message.to_string()
            }
        }
    }

    /// Full composition: settings, personalization, best-effort AI
    pub async fn compose(
        &self,
        message: &str,
        targets: &[&Person],
        occupants: &[&Person],
        overrides: ComposeOverrides,
    ) -> (String, VoiceSettings) {
        let mut settings = self.select_settings(targets, occupants);
        if let Some(enhance) = overrides.enhance {
            settings.enhance = enhance;
        }
        if let Some(translate) = overrides.translate {
            settings.translate = translate;
        }

        let name = self.resolve_name(targets, occupants);
        let personalized = self.personalize(message, name.as_deref());

        let final_text = if settings.enhance || settings.translate {
            self.enhance_text(&personalized, &settings).await
        } else {
            personalized
        };

        (final_text, settings)
    }
}
