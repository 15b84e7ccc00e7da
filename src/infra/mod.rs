//! Infrastructure - configuration and shared state
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, validation)
//! - `registry` - Shared enable/mute registry consulted by the gate

pub mod config;
pub mod registry;

// Re-export commonly used types
pub use config::Config;
pub use registry::EnableRegistry;
