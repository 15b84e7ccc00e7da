//! roomcast - occupancy-aware announcement routing
//!
//! Dry-run host: loads a TOML configuration, seeds an in-memory host with
//! entity states passed on the command line, dispatches one announcement,
//! and reports the per-room outcome with the capability calls the engine
//! would have issued against a real platform.
//!
//! Module structure:
//! - `domain/` - Core announcement types (Person, Room, Request, Report)
//! - `io/` - Host collaborator seam (HostApi, MemoryHost)
//! - `services/` - Routing logic (Targeting, Gate, Composer, Dispatcher)
//! - `infra/` - Infrastructure (Config, EnableRegistry)

use clap::Parser;
use roomcast::domain::types::AnnouncementRequest;
use roomcast::infra::{Config, EnableRegistry};
use roomcast::io::{MemoryHost, StateSnapshot};
use roomcast::services::AnnouncementDispatcher;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// roomcast - route a spoken announcement to the right rooms
#[derive(Parser, Debug)]
#[command(name = "roomcast", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Message to announce
    message: String,

    /// Target person name(s), comma-separated
    #[arg(long)]
    person: Option<String>,

    /// Target room name or id
    #[arg(long)]
    area: Option<String>,

    /// Seed a host entity state, e.g. --state person.mike=home (repeatable)
    #[arg(long = "state", value_name = "ENTITY=VALUE")]
    states: Vec<String>,

    /// Force AI enhancement for this announcement
    #[arg(long)]
    enhance: bool,

    /// Force translation for this announcement
    #[arg(long)]
    translate: bool,

    /// Skip the pre-announce chime
    #[arg(long)]
    no_chime: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration first so debug_mode can raise the default level
    let config = Config::load_from_path(&args.config);

    let default_level = if config.debug_mode() { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git_hash = %env!("GIT_HASH"),
        "roomcast starting"
    );
    info!(
        config_file = %config.config_file(),
        people = %config.people().len(),
        rooms = %config.rooms().len(),
        room_tracking = %config.room_tracking(),
        presence_verification = %config.presence_verification(),
        pre_announce = %config.pre_announce_enabled(),
        "config_loaded"
    );

    let host = Arc::new(MemoryHost::new());
    for state in &args.states {
        match state.split_once('=') {
            Some((entity, value)) => {
                host.set_state(entity.trim(), StateSnapshot::new(value.trim()));
            }
            None => warn!(state = %state, "ignoring malformed --state, expected ENTITY=VALUE"),
        }
    }

    let registry = Arc::new(EnableRegistry::new());
    let dispatcher = AnnouncementDispatcher::new(Arc::new(config), host.clone(), registry);

    let mut request = AnnouncementRequest::new(&args.message);
    request.target_person = args.person;
    request.target_area = args.area;
    if args.enhance {
        request.enhance_with_ai = Some(true);
    }
    if args.translate {
        request.translate = Some(true);
    }
    if args.no_chime {
        request.pre_announce = Some(false);
    }

    match dispatcher.announce(&request).await {
        Ok(report) => {
            for room in &report.rooms {
                info!(
                    room = %room.room_name,
                    outcome = %room.outcome.as_str(),
                    "room_outcome"
                );
            }
            info!(
                id = %report.announcement_id,
                delivered = %report.delivered(),
                attempted = %report.rooms.len(),
                "announcement_complete"
            );
        }
        Err(e) => {
            error!(error = %e, "announcement_failed");
            std::process::exit(1);
        }
    }

    for call in host.calls() {
        info!(capability = %call.name(), payload = %call.payload, "capability_call");
    }

    Ok(())
}
