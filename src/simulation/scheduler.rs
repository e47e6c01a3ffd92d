//! Periodic shuttle dispatch and departure handling
//!
//! A shuttle that is not on the hub map heads for the hub; one that is heads
//! for its destination. Which leg it is on is read from where it actually is,
//! never from a stored flag.

use log::{debug, info};

use super::config::TransitConfig;
use super::entity::EntityStore;
use super::jump::{JumpCommand, JumpDrive, JumpStarted};
use super::ledger::RegistrationLedger;
use super::registry::{Shuttle, TransitRegistry};
use super::resolver::{DockTarget, LocationResolver};
use super::scanner;
use super::types::{DockSide, EntityId};

/// What happened when a shuttle left a map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepartureReport {
    pub shuttle: Option<EntityId>,
    pub leaving_hub: bool,
    /// Entities set down at the origin
    pub ejected: Vec<EntityId>,
    /// Actors whose transit token was consumed
    pub revoked: Vec<EntityId>,
}

/// Destination-side dock for a shuttle, preferring its own destination map
fn destination_dock(
    resolver: &LocationResolver,
    registry: &TransitRegistry,
    shuttle: &Shuttle,
) -> Option<DockTarget> {
    registry
        .destination_map(shuttle.destination)
        .and_then(|map| resolver.find_dock_point_on(map))
        .and_then(|dock| resolver.dock_target(dock))
        .or_else(|| resolver.resolve(DockSide::Destination))
}

/// Decide for every due shuttle where it goes next
/// Returns the jumps to issue. Shuttles that can't be dispatched keep their
/// decision time and are retried next tick.
pub fn update_shuttles(
    registry: &mut TransitRegistry,
    store: &EntityStore,
    jumps: &JumpDrive,
    config: &TransitConfig,
    now: f32,
) -> Vec<JumpCommand> {
    let resolver = LocationResolver::new(store, &registry.hubs);
    let Some(hub_dock) = resolver.resolve(DockSide::Hub) else {
        return Vec::new();
    };

    let trip = config.trip_secs();
    let mut dispatches = Vec::new();

    for shuttle in registry.shuttles.values() {
        if shuttle.next_decision > now || jumps.is_jumping(shuttle.entity) {
            continue;
        }
        let Some(current_map) = store.map_of(shuttle.entity) else {
            continue;
        };
        let Some(destination_dock) = destination_dock(&resolver, registry, shuttle) else {
            debug!("No destination dock for {:?}, retrying next tick", shuttle.entity);
            continue;
        };

        let (target, next_decision) = if current_map != hub_dock.map {
            // Return leg
            (hub_dock, now + config.cooldown_secs)
        } else {
            // Destination dwell and the return trip are paid up front
            (destination_dock, now + config.cooldown_secs + trip)
        };

        dispatches.push((
            shuttle.entity,
            next_decision,
            JumpCommand {
                entity: shuttle.entity,
                target_map: target.map,
                target: target.transform,
                startup: config.startup_secs,
                duration: config.travel_secs,
            },
        ));
    }

    let mut commands = Vec::with_capacity(dispatches.len());
    for (entity, next_decision, command) in dispatches {
        if let Some(shuttle) = registry.shuttles.get_mut(&entity) {
            shuttle.next_arrival = now + trip;
            shuttle.next_decision = next_decision;
        }
        commands.push(command);
    }
    commands
}

/// React to a shuttle leaving a map
///
/// Beings without a token are left where the shuttle was, on any map. After
/// leaving the hub, every token holder that is no longer on the hub map has
/// departed and its token is consumed.
pub fn handle_jump_started(
    event: &JumpStarted,
    registry: &TransitRegistry,
    store: &mut EntityStore,
    ledger: &mut RegistrationLedger,
    config: &TransitConfig,
) -> DepartureReport {
    if !registry.shuttles.contains_key(&event.shuttle) {
        return DepartureReport::default();
    }
    let Some(hub_map) = LocationResolver::new(store, &registry.hubs).find_hub() else {
        return DepartureReport::default();
    };

    let leaving_hub = event.origin_map == Some(hub_map);
    let mut report = DepartureReport {
        shuttle: Some(event.shuttle),
        leaving_hub,
        ..Default::default()
    };

    if let Some(origin_map) = event.origin_map {
        if leaving_hub || !config.returns_allowed {
            let candidates = scanner::scan(store, event.shuttle);
            report.ejected =
                scanner::eject(store, &candidates, origin_map, &event.origin_transform);
        }
    }

    if leaving_hub {
        report.revoked = ledger.sweep_departed(store, hub_map);
    }

    if !report.ejected.is_empty() || !report.revoked.is_empty() {
        info!(
            "Shuttle {:?} left {}: {} left behind, {} tokens consumed",
            event.shuttle,
            if leaving_hub { "the hub" } else { "a non-hub map" },
            report.ejected.len(),
            report.revoked.len()
        );
    }
    report
}
