//! IO modules - the host collaborator seam
//!
//! This module contains everything that crosses the host boundary:
//! - `host` - collaborator trait (state reads, capability calls, events)
//!   and the timeout-aware `HostHandle`
//! - `memory` - in-memory scripted host for the dry-run binary and tests

pub mod host;
pub mod memory;

// Re-export commonly used types
pub use host::{CapabilityCall, HostApi, HostHandle, StateSnapshot};
pub use memory::MemoryHost;
