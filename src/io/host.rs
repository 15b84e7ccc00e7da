//! Host collaborator interface
//!
//! The engine never talks to devices directly. The hosting platform
//! implements `HostApi`: state snapshot reads, abstract capability calls
//! (chime playback, TTS speak, AI text processing), and fire-and-forget
//! events. `HostHandle` wraps an implementation with the configured
//! optional capability-call timeout.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Event fired after a successful TTS delivery
pub const EVENT_ANNOUNCEMENT_SENT: &str = "roomcast_announcement_sent";
/// Event fired when a gate check rejects a delivery
pub const EVENT_ANNOUNCEMENT_BLOCKED: &str = "roomcast_announcement_blocked";

pub const CAP_MEDIA_PLAYER: &str = "media_player";
pub const CAP_PLAY_MEDIA: &str = "play_media";
pub const CAP_TTS: &str = "tts";
pub const CAP_SPEAK: &str = "speak";
pub const CAP_CONVERSATION: &str = "conversation";
pub const CAP_PROCESS: &str = "process";

/// Point-in-time view of one host entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub value: String,
    pub attributes: HashMap<String, String>,
}

impl StateSnapshot {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), attributes: HashMap::new() }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// One abstract service invocation routed through the host
#[derive(Debug, Clone)]
pub struct CapabilityCall {
    pub domain: String,
    pub action: String,
    pub payload: Value,
    pub blocking: bool,
}

impl CapabilityCall {
    pub fn new(domain: &str, action: &str, payload: Value) -> Self {
        Self { domain: domain.to_string(), action: action.to_string(), payload, blocking: false }
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// `domain.action` label used in logs and failure injection
    pub fn name(&self) -> String {
        format!("{}.{}", self.domain, self.action)
    }
}

/// Collaborator contract the hosting platform implements
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Read a live signal; `None` when the entity is unknown to the host
    fn get_state(&self, entity: &str) -> Option<StateSnapshot>;

    /// Invoke an external service; only the AI call returns a response body
    async fn call_capability(&self, call: CapabilityCall) -> Result<Option<Value>>;

    /// Fire-and-forget notification
    fn emit_event(&self, name: &str, payload: Value);
}

/// Shared host reference plus the configured capability-call timeout
///
/// The original integration waited forever on a hung TTS or AI call; that
/// stays the default, but a timeout can be configured and is applied here
/// so no call site handles it separately.
#[derive(Clone)]
pub struct HostHandle {
    api: Arc<dyn HostApi>,
    timeout: Option<Duration>,
}

impl HostHandle {
    pub fn new(api: Arc<dyn HostApi>) -> Self {
        Self { api, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn get_state(&self, entity: &str) -> Option<StateSnapshot> {
        self.api.get_state(entity)
    }

    pub async fn call_capability(&self, call: CapabilityCall) -> Result<Option<Value>> {
        match self.timeout {
            Some(limit) => {
                let name = call.name();
                match tokio::time::timeout(limit, self.api.call_capability(call)).await {
                    Ok(result) => result,
                    Err(_) => {
                        Err(anyhow!("capability call {} timed out after {:?}", name, limit))
                    }
                }
            }
            None => self.api.call_capability(call).await,
        }
    }

    pub fn emit_event(&self, name: &str, payload: Value) {
        self.api.emit_event(name, payload);
    }
}
