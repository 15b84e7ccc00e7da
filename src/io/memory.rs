//! In-memory scripted host
//!
//! A `HostApi` implementation backed by hash maps: entity states are seeded
//! up front, capability calls are recorded instead of executed, and
//! failures can be injected per capability (optionally per target entity).
//! Used by the dry-run binary and by tests.

use super::host::{CapabilityCall, HostApi, StateSnapshot, CAP_CONVERSATION, CAP_PROCESS};
use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct FailRule {
    capability: String,
    entity: Option<String>,
}

#[derive(Default)]
pub struct MemoryHost {
    states: RwLock<HashMap<String, StateSnapshot>>,
    calls: Mutex<Vec<CapabilityCall>>,
    events: Mutex<Vec<(String, Value)>>,
    failures: Mutex<Vec<FailRule>>,
    ai_reply: RwLock<Option<String>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, entity: &str, snapshot: StateSnapshot) {
        self.states.write().insert(entity.to_string(), snapshot);
    }

    pub fn remove_state(&self, entity: &str) {
        self.states.write().remove(entity);
    }

    /// Make every call to `domain.action` fail
    pub fn fail_capability(&self, capability: &str) {
        self.failures.lock().push(FailRule { capability: capability.to_string(), entity: None });
    }

    /// Make calls to `domain.action` fail only when the payload targets `entity`
    pub fn fail_capability_for(&self, capability: &str, entity: &str) {
        self.failures.lock().push(FailRule {
            capability: capability.to_string(),
            entity: Some(entity.to_string()),
        });
    }

    /// Script the text the AI capability responds with; unset echoes the input
    pub fn set_ai_reply(&self, reply: &str) {
        *self.ai_reply.write() = Some(reply.to_string());
    }

    pub fn calls(&self) -> Vec<CapabilityCall> {
        self.calls.lock().clone()
    }

    /// Recorded calls matching a `domain.action` label
    pub fn calls_for(&self, capability: &str) -> Vec<CapabilityCall> {
        self.calls.lock().iter().filter(|c| c.name() == capability).cloned().collect()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    fn should_fail(&self, call: &CapabilityCall) -> bool {
        let name = call.name();
        let target = call.payload.get("entity_id").and_then(Value::as_str);
        self.failures.lock().iter().any(|rule| {
            rule.capability == name
                && rule.entity.as_deref().map_or(true, |entity| target == Some(entity))
        })
    }
}

#[async_trait]
impl HostApi for MemoryHost {
    fn get_state(&self, entity: &str) -> Option<StateSnapshot> {
        self.states.read().get(entity).cloned()
    }

    async fn call_capability(&self, call: CapabilityCall) -> Result<Option<Value>> {
        let fail = self.should_fail(&call);
        let name = call.name();
        let is_ai = call.domain == CAP_CONVERSATION && call.action == CAP_PROCESS;
        let input_text =
            call.payload.get("text").and_then(Value::as_str).unwrap_or_default().to_string();

        self.calls.lock().push(call);

        if fail {
            bail!("scripted failure for {}", name);
        }

        if is_ai {
            let reply = self.ai_reply.read().clone().unwrap_or(input_text);
            return Ok(Some(json!({
                "response": {"speech": {"plain": {"speech": reply}}}
            })));
        }

        Ok(None)
    }

    fn emit_event(&self, name: &str, payload: Value) {
        self.events.lock().push((name.to_string(), payload));
    }
}
