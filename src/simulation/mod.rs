//! Standalone transit simulation module
//!
//! Contains the hub/shuttle scheduling core. It runs independently of any
//! game engine and can be driven headless from the console or from tests.

mod blueprint;
mod config;
mod entity;
mod jump;
mod ledger;
mod lifecycle;
mod registry;
mod resolver;
mod scanner;
mod scheduler;
mod types;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use blueprint::{BlueprintLibrary, EntityBlueprint, MapBlueprint};
#[allow(unused_imports)]
pub use config::{
    ConfigChange, ConfigService, ConfigSubscription, TransitConfig, DEFAULT_HUB_MAP_PATH,
};
#[allow(unused_imports)]
pub use entity::{EntityStore, SimEntity, TransitToken};
#[allow(unused_imports)]
pub use jump::{JumpArrived, JumpCommand, JumpDrive, JumpEvent, JumpStarted};
#[allow(unused_imports)]
pub use ledger::RegistrationLedger;
#[allow(unused_imports)]
pub use lifecycle::{HubLifecycleManager, SpawnRequest, TransitContext, HUB_MAP_NAME};
#[allow(unused_imports)]
pub use registry::{Destination, Shuttle, TransitRegistry};
#[allow(unused_imports)]
pub use resolver::{DockTarget, LocationResolver};
#[allow(unused_imports)]
pub use scanner::{eject, scan, EjectionCandidate};
#[allow(unused_imports)]
pub use scheduler::{handle_jump_started, update_shuttles, DepartureReport};
#[allow(unused_imports)]
pub use types::{
    DestinationId, DockSide, EntityId, Position, RunLevel, SimId, SpawnPointKind, Transform,
    ROUND_START_JUMP_SECS, STAGING_MAP_LIFETIME_SECS,
};
pub use world::{TransitWorld, DEMO_SHUTTLE_PATH, DEMO_STATION_PATH};
