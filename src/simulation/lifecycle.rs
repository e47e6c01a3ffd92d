//! Hub and shuttle lifecycle
//!
//! Creates the hub and one shuttle per destination while transit is enabled,
//! and tears all of it down when it is disabled. Setup is idempotent: asking
//! for a hub or shuttle that already exists does nothing.

use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use sorted_vec::SortedVec;

use super::blueprint::BlueprintLibrary;
use super::config::TransitConfig;
use super::entity::EntityStore;
use super::jump::{JumpCommand, JumpDrive};
use super::ledger::RegistrationLedger;
use super::registry::{Destination, Shuttle, TransitRegistry};
use super::resolver::LocationResolver;
use super::types::{
    DestinationId, DockSide, EntityId, RunLevel, SimId, SpawnPointKind, ROUND_START_JUMP_SECS,
    STAGING_MAP_LIFETIME_SECS,
};

/// Display name given to the loaded hub map
pub const HUB_MAP_NAME: &str = "Transit hub";

/// Everything lifecycle operations need to touch, borrowed for one call
pub struct TransitContext<'a> {
    pub store: &'a mut EntityStore,
    pub blueprints: &'a BlueprintLibrary,
    pub ledger: &'a mut RegistrationLedger,
    pub jumps: &'a mut JumpDrive,
    pub config: &'a TransitConfig,
    pub now: f32,
}

/// A request for somewhere to put a newly joining actor
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub name: String,
    /// The destination the actor is joining
    pub destination: Option<DestinationId>,
    /// Filled in by whoever services the request
    pub result: Option<EntityId>,
}

impl SpawnRequest {
    pub fn new(name: &str, destination: Option<DestinationId>) -> Self {
        Self {
            name: name.to_string(),
            destination,
            result: None,
        }
    }
}

pub struct HubLifecycleManager {
    pub registry: TransitRegistry,
    enabled: bool,
    /// Entities to delete once their time comes
    despawn_timers: SortedVec<(OrderedFloat<f32>, EntityId)>,
    rng: Option<StdRng>,
    next_destination: usize,
}

impl HubLifecycleManager {
    fn new_internal(enabled: bool, rng: Option<StdRng>) -> Self {
        Self {
            registry: TransitRegistry::new(),
            enabled,
            despawn_timers: SortedVec::new(),
            rng,
            next_destination: 0,
        }
    }

    pub fn new(enabled: bool) -> Self {
        Self::new_internal(enabled, None)
    }

    /// Create a manager with a seeded RNG for reproducible spawn point picks
    pub fn new_with_seed(enabled: bool, seed: u64) -> Self {
        Self::new_internal(enabled, Some(StdRng::seed_from_u64(seed)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending_despawns(&self) -> usize {
        self.despawn_timers.len()
    }

    fn choose_random<T: Copy>(&mut self, slice: &[T]) -> Option<T> {
        match &mut self.rng {
            Some(rng) => slice.choose(rng).copied(),
            None => slice.choose(&mut rand::rng()).copied(),
        }
    }

    /// Turn transit on or off
    pub fn set_enabled(&mut self, enabled: bool, ctx: &mut TransitContext) {
        self.enabled = enabled;

        if enabled {
            self.setup_hub(ctx);
        } else {
            self.teardown(ctx);
        }
    }

    /// Delete every hub and every shuttle
    pub fn teardown(&mut self, ctx: &mut TransitContext) {
        let doomed: Vec<EntityId> = self
            .registry
            .hubs
            .iter()
            .chain(self.registry.shuttles.keys())
            .copied()
            .collect();

        let mut removed = Vec::new();
        for id in doomed {
            removed.extend(ctx.store.delete(id));
        }
        ctx.ledger.forget(&removed);
        self.registry.clear_infrastructure();

        if !removed.is_empty() {
            info!("Transit disabled, removed {} entities", removed.len());
        }
    }

    /// Round is starting: bring up the hub if transit is on
    pub fn on_round_starting(&mut self, ctx: &mut TransitContext) {
        if !self.enabled {
            return;
        }
        self.setup_hub(ctx);
    }

    /// Everything from the previous round is gone
    pub fn on_round_reset(&mut self) {
        self.registry.clear();
        self.despawn_timers.clear();
    }

    /// Register a location that wants a shuttle
    pub fn add_destination(&mut self, map: EntityId, shuttle_path: &str) -> DestinationId {
        let id = DestinationId(SimId(self.next_destination));
        self.next_destination += 1;
        self.registry.destinations.insert(
            id,
            Destination {
                id,
                map,
                shuttle_path: shuttle_path.to_string(),
                shuttle: None,
            },
        );
        id
    }

    /// Stop serving a destination and delete its shuttle
    pub fn remove_destination(&mut self, id: DestinationId, ctx: &mut TransitContext) {
        let Some(destination) = self.registry.destinations.remove(&id) else {
            return;
        };
        if let Some(shuttle) = destination.shuttle {
            self.delete_entity(shuttle, ctx);
        }
    }

    /// A destination finished initializing
    /// Late joiners get a shuttle only if the hub is already there to dock at.
    pub fn on_destination_ready(&mut self, id: DestinationId, ctx: &mut TransitContext) {
        if !self.enabled {
            return;
        }
        self.create_shuttle(id, ctx);
    }

    /// Load the hub map unless one is already live, then make sure every
    /// destination has a shuttle
    pub fn setup_hub(&mut self, ctx: &mut TransitContext) {
        let existing = LocationResolver::new(ctx.store, &self.registry.hubs).find_hub();

        if existing.is_none() {
            let map = match ctx.blueprints.load_map(ctx.store, &ctx.config.hub_map_path) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Failed to load transit hub: {:#}", e);
                    return;
                }
            };

            if let Some(entity) = ctx.store.get_mut(map) {
                entity.name = HUB_MAP_NAME.to_string();
                entity.hub_marker = true;
                entity.protected = true;
            }
            self.registry.hubs.push(map);
            info!("Transit hub created at {:?}", map);
        }

        let destinations: Vec<DestinationId> = self.registry.destinations.keys().copied().collect();
        for id in destinations {
            self.create_shuttle(id, ctx);
        }
    }

    /// Spawn a shuttle for `id` on a staging map and send it to dock at the hub
    /// Returns the new shuttle, or None if one already exists or setup failed
    pub fn create_shuttle(
        &mut self,
        id: DestinationId,
        ctx: &mut TransitContext,
    ) -> Option<EntityId> {
        let destination = self.registry.destinations.get(&id)?;
        if destination
            .shuttle
            .is_some_and(|shuttle| ctx.store.exists(shuttle))
        {
            return None;
        }
        let shuttle_path = destination.shuttle_path.clone();

        let staging = ctx.store.create_map("Staging map");
        // The staging map is cleaned up whether or not the shuttle made it
        self.schedule_despawn(staging, ctx.now + STAGING_MAP_LIFETIME_SECS);

        let hub_dock = LocationResolver::new(ctx.store, &self.registry.hubs).resolve(DockSide::Hub);
        let Some(hub_dock) = hub_dock else {
            debug!("No hub dock point yet, skipping shuttle for {:?}", id);
            return None;
        };

        let shuttle = match ctx.blueprints.load_grid(ctx.store, staging, &shuttle_path) {
            Ok(shuttle) => shuttle,
            Err(e) => {
                warn!("Failed to load shuttle for {:?}: {:#}", id, e);
                return None;
            }
        };

        if let Some(entity) = ctx.store.get_mut(shuttle) {
            entity.pilot_locked = true;
        }

        ctx.jumps.issue(
            ctx.now,
            JumpCommand {
                entity: shuttle,
                target_map: hub_dock.map,
                target: hub_dock.transform,
                startup: ctx.config.startup_secs,
                duration: ROUND_START_JUMP_SECS,
            },
        );

        self.registry.register_shuttle(Shuttle {
            entity: shuttle,
            destination: id,
            next_decision: ctx.now + ctx.config.cooldown_secs,
            next_arrival: ctx.now + ctx.config.startup_secs + ROUND_START_JUMP_SECS,
        });
        info!("Shuttle {:?} created for {:?}", shuttle, id);
        Some(shuttle)
    }

    /// Delete `entity` once `at` has passed
    pub fn schedule_despawn(&mut self, entity: EntityId, at: f32) {
        self.despawn_timers.insert((OrderedFloat(at), entity));
    }

    /// Delete everything whose timer has run out
    pub fn process_timers(&mut self, ctx: &mut TransitContext) {
        while let Some(&(OrderedFloat(at), entity)) = self.despawn_timers.first() {
            if at > ctx.now {
                break;
            }
            self.despawn_timers.remove_index(0);
            debug!("Timed despawn of {:?}", entity);
            self.delete_entity(entity, ctx);
        }
    }

    /// Delete an entity and keep the registry and ledger in step
    pub fn delete_entity(&mut self, entity: EntityId, ctx: &mut TransitContext) {
        let mut pending = vec![entity];
        while let Some(id) = pending.pop() {
            let removed = ctx.store.delete(id);
            if removed.is_empty() {
                continue;
            }
            ctx.ledger.forget(&removed);
            pending.extend(self.registry.forget(&removed));
        }
    }

    /// Service a spawn request by placing the actor at the hub with a token
    /// Only late joiners bound for a transit destination are handled; anything
    /// else is left for other spawners.
    pub fn handle_actor_spawning(
        &mut self,
        request: &mut SpawnRequest,
        run_level: RunLevel,
        ctx: &mut TransitContext,
    ) -> Option<EntityId> {
        if request.result.is_some() {
            return None;
        }
        if !self.enabled || run_level != RunLevel::InRound {
            return None;
        }
        let destination = request.destination?;
        if !self.registry.destinations.contains_key(&destination) {
            return None;
        }

        let hub = LocationResolver::new(ctx.store, &self.registry.hubs).find_hub()?;
        let points = ctx.store.spawn_points(hub, SpawnPointKind::LateJoin);
        let point = self.choose_random(&points)?;
        let at = ctx.store.world_transform(point)?;

        let actor = match ctx.store.spawn(hub, &request.name, at) {
            Ok(actor) => actor,
            Err(e) => {
                warn!("Failed to spawn {} at the hub: {:#}", request.name, e);
                return None;
            }
        };
        if let Some(entity) = ctx.store.get_mut(actor) {
            entity.mob = true;
        }
        ctx.ledger.grant(ctx.store, actor, ctx.now);
        request.result = Some(actor);

        debug!("Spawned {} at the hub as {:?}", request.name, actor);
        Some(actor)
    }
}
