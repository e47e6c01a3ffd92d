//! Main simulation world that ties everything together
//!
//! This is the entry point for running the transit simulation. Every
//! operation runs to completion on the caller's thread inside a tick or one
//! of the lifecycle entry points.

use anyhow::{Context, Result};
use log::{debug, info};

use super::blueprint::{BlueprintLibrary, EntityBlueprint, MapBlueprint};
use super::config::{ConfigChange, ConfigService, ConfigSubscription, TransitConfig};
use super::entity::EntityStore;
use super::jump::{JumpDrive, JumpEvent};
use super::ledger::RegistrationLedger;
use super::lifecycle::{HubLifecycleManager, SpawnRequest, TransitContext};
use super::registry::Shuttle;
use super::resolver::LocationResolver;
use super::scheduler::{self, DepartureReport};
use super::types::{DestinationId, EntityId, RunLevel, SpawnPointKind, Transform};

/// Grid blueprint path of the demo shuttle
pub const DEMO_SHUTTLE_PATH: &str = "/Maps/Shuttles/arrivals.yml";
/// Map blueprint path of the demo station
pub const DEMO_STATION_PATH: &str = "/Maps/station.yml";

/// The main simulation world
pub struct TransitWorld {
    pub store: EntityStore,
    pub blueprints: BlueprintLibrary,
    pub ledger: RegistrationLedger,
    pub jumps: JumpDrive,
    pub lifecycle: HubLifecycleManager,
    config: ConfigService,
    subscription: Option<ConfigSubscription>,
    run_level: RunLevel,

    /// Simulation time
    pub time: f32,
}

impl TransitWorld {
    fn new_internal(
        config: TransitConfig,
        blueprints: BlueprintLibrary,
        lifecycle: HubLifecycleManager,
    ) -> Self {
        let mut config = ConfigService::new(config);
        let subscription = Some(config.subscribe());
        Self {
            store: EntityStore::new(),
            blueprints,
            ledger: RegistrationLedger::new(),
            jumps: JumpDrive::new(),
            lifecycle,
            config,
            subscription,
            run_level: RunLevel::PreRound,
            time: 0.0,
        }
    }

    pub fn new(config: TransitConfig, blueprints: BlueprintLibrary) -> Self {
        let lifecycle = HubLifecycleManager::new(config.enabled);
        Self::new_internal(config, blueprints, lifecycle)
    }

    /// Create a new TransitWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(config: TransitConfig, blueprints: BlueprintLibrary, seed: u64) -> Self {
        let lifecycle = HubLifecycleManager::new_with_seed(config.enabled, seed);
        Self::new_internal(config, blueprints, lifecycle)
    }

    fn parts(&mut self) -> (&mut HubLifecycleManager, TransitContext<'_>) {
        (
            &mut self.lifecycle,
            TransitContext {
                store: &mut self.store,
                blueprints: &self.blueprints,
                ledger: &mut self.ledger,
                jumps: &mut self.jumps,
                config: self.config.current(),
                now: self.time,
            },
        )
    }

    pub fn config(&self) -> &TransitConfig {
        self.config.current()
    }

    /// Change settings; the world picks up the changes on its next tick
    pub fn config_mut(&mut self) -> &mut ConfigService {
        &mut self.config
    }

    pub fn run_level(&self) -> RunLevel {
        self.run_level
    }

    /// Toggle transit and apply it right away
    /// Runs setup or teardown even when the setting already had this value.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.set_enabled(enabled);
        self.apply_config_changes();
        let (lifecycle, mut ctx) = self.parts();
        lifecycle.set_enabled(enabled, &mut ctx);
    }

    /// Stop listening for configuration changes
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.config.unsubscribe(subscription.id);
        }
    }

    fn apply_config_changes(&mut self) {
        let changes = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return,
        };

        for change in changes {
            match change {
                ConfigChange::Enabled(enabled) => {
                    info!("Transit {}", if enabled { "enabled" } else { "disabled" });
                    let (lifecycle, mut ctx) = self.parts();
                    lifecycle.set_enabled(enabled, &mut ctx);
                }
                // Everything else is read where it is used
                other => debug!("Config change picked up: {:?}", other),
            }
        }
    }

    /// Load a map blueprint into the world (e.g. a destination station)
    pub fn load_map(&mut self, path: &str) -> Result<EntityId> {
        self.blueprints
            .load_map(&mut self.store, path)
            .with_context(|| format!("Loading {}", path))
    }

    pub fn start_round(&mut self) {
        info!("Round starting");
        self.run_level = RunLevel::InRound;
        let (lifecycle, mut ctx) = self.parts();
        lifecycle.on_round_starting(&mut ctx);
    }

    pub fn end_round(&mut self) {
        self.run_level = RunLevel::PostRound;
    }

    /// Wipe the round: every entity, token and jump goes away
    pub fn reset_round(&mut self) {
        info!("Round reset");
        self.store.clear();
        self.jumps.clear();
        self.ledger.clear();
        self.lifecycle.on_round_reset();
        self.run_level = RunLevel::PreRound;
    }

    pub fn add_destination(&mut self, map: EntityId, shuttle_path: &str) -> DestinationId {
        self.lifecycle.add_destination(map, shuttle_path)
    }

    pub fn destination_ready(&mut self, id: DestinationId) {
        let (lifecycle, mut ctx) = self.parts();
        lifecycle.on_destination_ready(id, &mut ctx);
    }

    pub fn remove_destination(&mut self, id: DestinationId) {
        let (lifecycle, mut ctx) = self.parts();
        lifecycle.remove_destination(id, &mut ctx);
    }

    pub fn create_shuttle(&mut self, id: DestinationId) -> Option<EntityId> {
        let (lifecycle, mut ctx) = self.parts();
        lifecycle.create_shuttle(id, &mut ctx)
    }

    /// Offer a spawn request to the transit system
    pub fn request_spawn(&mut self, request: &mut SpawnRequest) -> Option<EntityId> {
        let run_level = self.run_level;
        let (lifecycle, mut ctx) = self.parts();
        lifecycle.handle_actor_spawning(request, run_level, &mut ctx)
    }

    pub fn grant_token(&mut self, actor: EntityId) -> bool {
        self.ledger.grant(&mut self.store, actor, self.time)
    }

    pub fn revoke_token(&mut self, actor: EntityId) -> bool {
        self.ledger.revoke(&mut self.store, actor)
    }

    pub fn holds_token(&self, actor: EntityId) -> bool {
        self.ledger.holds(&self.store, actor)
    }

    /// Attach an actor to a shuttle at the given local offset
    pub fn board(&mut self, actor: EntityId, shuttle: EntityId, local: Transform) -> Result<()> {
        self.store.reparent(actor, shuttle, local)
    }

    pub fn find_hub(&self) -> Option<EntityId> {
        LocationResolver::new(&self.store, &self.lifecycle.registry.hubs).find_hub()
    }

    pub fn hub_count(&self) -> usize {
        self.lifecycle
            .registry
            .hubs
            .iter()
            .filter(|hub| self.store.exists(**hub))
            .count()
    }

    pub fn shuttles(&self) -> impl Iterator<Item = &Shuttle> {
        self.lifecycle.registry.shuttles.values()
    }

    pub fn shuttle_for(&self, id: DestinationId) -> Option<&Shuttle> {
        self.lifecycle
            .registry
            .shuttles
            .values()
            .find(|s| s.destination == id)
    }

    /// Whether `entity` is currently on the hub map
    pub fn is_at_hub(&self, entity: EntityId) -> bool {
        let hub = self.find_hub();
        hub.is_some() && self.store.map_of(entity) == hub
    }

    /// Main simulation tick
    /// Returns a report for every shuttle that left a map during this tick
    pub fn tick(&mut self, delta_secs: f32) -> Vec<DepartureReport> {
        self.time += delta_secs;

        self.apply_config_changes();

        let (lifecycle, mut ctx) = self.parts();
        lifecycle.process_timers(&mut ctx);

        let commands = scheduler::update_shuttles(
            &mut lifecycle.registry,
            ctx.store,
            ctx.jumps,
            ctx.config,
            ctx.now,
        );
        for command in commands {
            ctx.jumps.issue(ctx.now, command);
        }

        let mut departures = Vec::new();
        for event in ctx.jumps.advance(ctx.store, ctx.now) {
            match event {
                JumpEvent::Started(started) => {
                    departures.push(scheduler::handle_jump_started(
                        &started,
                        &lifecycle.registry,
                        ctx.store,
                        ctx.ledger,
                        ctx.config,
                    ));
                }
                JumpEvent::Arrived(arrived) => {
                    debug!("Shuttle {:?} arrived on {:?}", arrived.shuttle, arrived.map);
                }
            }
        }
        departures
    }

    /// Build a small world: a hub with a dock and late-join spawn points, one
    /// station with a dock, and a shuttle carrying a crate with a stowaway
    pub fn create_demo_world(config: TransitConfig, seed: u64) -> Result<(Self, DestinationId)> {
        let mut blueprints = BlueprintLibrary::new();

        blueprints.register_map(
            &config.hub_map_path,
            MapBlueprint::new("Arrivals").with_entity(
                EntityBlueprint::new("Arrivals platform", Transform::at(0.0, 0.0))
                    .with_child(EntityBlueprint::dock_point(
                        "Arrivals dock",
                        Transform::at(12.0, 0.0),
                    ))
                    .with_child(EntityBlueprint::spawn_point(
                        "Late join spawner",
                        Transform::at(-4.0, 2.0),
                        SpawnPointKind::LateJoin,
                    ))
                    .with_child(EntityBlueprint::spawn_point(
                        "Late join spawner",
                        Transform::at(-4.0, -2.0),
                        SpawnPointKind::LateJoin,
                    ))
                    .with_child(EntityBlueprint::spawn_point(
                        "Round start spawner",
                        Transform::at(0.0, 0.0),
                        SpawnPointKind::RoundStart,
                    )),
            ),
        );

        blueprints.register_map(
            DEMO_STATION_PATH,
            MapBlueprint::new("Station").with_entity(
                EntityBlueprint::new("Station hull", Transform::at(100.0, 40.0))
                    .with_child(EntityBlueprint::dock_point(
                        "Station dock",
                        Transform::at(-20.0, 0.0),
                    )),
            ),
        );

        blueprints.register_grid(
            DEMO_SHUTTLE_PATH,
            EntityBlueprint::new("Arrivals shuttle", Transform::IDENTITY)
                .with_child(EntityBlueprint::new("Seat", Transform::at(1.0, 0.0)))
                .with_child(
                    EntityBlueprint::new("Cargo crate", Transform::at(-2.0, 1.0))
                        .with_child(EntityBlueprint::mob(
                            "Stowaway mouse",
                            Transform::at(0.2, 0.0),
                        )),
                ),
        );

        let mut world = Self::new_with_seed(config, blueprints, seed);
        world.start_round();

        let station = world.load_map(DEMO_STATION_PATH)?;
        let destination = world.add_destination(station, DEMO_SHUTTLE_PATH);
        world.destination_ready(destination);

        Ok((world, destination))
    }

    /// Log a summary of the world state
    pub fn print_summary(&self) {
        info!("=== Transit Simulation Summary ===");
        info!("Time: {:.2}s", self.time);
        info!("Entities: {}", self.store.len());
        info!("Hubs: {}", self.hub_count());
        info!("Destinations: {}", self.lifecycle.registry.destinations.len());
        info!("Token holders: {}", self.ledger.holder_count());
        info!("Jumps in progress: {}", self.jumps.active_count());

        for shuttle in self.shuttles() {
            let location = match self.store.map_of(shuttle.entity) {
                Some(map) if Some(map) == self.find_hub() => "hub".to_string(),
                Some(map) if Some(map) == self.jumps.transit_space() => "in transit".to_string(),
                Some(map) => self
                    .store
                    .get(map)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                None => "nowhere".to_string(),
            };
            info!(
                "  Shuttle {:?}: at {}, passengers={}, next decision {:.1}s, next arrival {:.1}s",
                shuttle.entity.0,
                location,
                self.store.children_of(shuttle.entity).len(),
                shuttle.next_decision,
                shuttle.next_arrival
            );
        }
    }
}

impl Default for TransitWorld {
    fn default() -> Self {
        Self::new(TransitConfig::default(), BlueprintLibrary::new())
    }
}
