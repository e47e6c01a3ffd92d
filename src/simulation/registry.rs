//! Indexed collections of live transit infrastructure
//!
//! Updated whenever a hub, shuttle or destination is created or destroyed, so
//! the per-tick code never has to scan the whole entity store.

use std::collections::BTreeMap;

use super::types::{DestinationId, EntityId};

/// Scheduling state of one live shuttle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shuttle {
    pub entity: EntityId,
    /// The destination this shuttle serves (back-reference only)
    pub destination: DestinationId,
    /// When the scheduler next decides where to send it
    pub next_decision: f32,
    /// When it is expected to arrive somewhere, informational
    pub next_arrival: f32,
}

/// A location that wants transit service from the hub
#[derive(Debug, Clone)]
pub struct Destination {
    pub id: DestinationId,
    pub map: EntityId,
    /// Grid blueprint used for this destination's shuttle
    pub shuttle_path: String,
    pub shuttle: Option<EntityId>,
}

#[derive(Debug, Default)]
pub struct TransitRegistry {
    pub hubs: Vec<EntityId>,
    pub shuttles: BTreeMap<EntityId, Shuttle>,
    pub destinations: BTreeMap<DestinationId, Destination>,
}

impl TransitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination_map(&self, id: DestinationId) -> Option<EntityId> {
        self.destinations.get(&id).map(|d| d.map)
    }

    /// Destination served by `map`, if any
    pub fn destination_for_map(&self, map: EntityId) -> Option<DestinationId> {
        self.destinations
            .values()
            .find(|d| d.map == map)
            .map(|d| d.id)
    }

    pub fn register_shuttle(&mut self, shuttle: Shuttle) {
        if let Some(destination) = self.destinations.get_mut(&shuttle.destination) {
            destination.shuttle = Some(shuttle.entity);
        }
        self.shuttles.insert(shuttle.entity, shuttle);
    }

    /// Forget every removed entity
    /// Returns the shuttles of destinations whose map was removed
    pub fn forget(&mut self, removed: &[EntityId]) -> Vec<EntityId> {
        self.hubs.retain(|hub| !removed.contains(hub));
        for id in removed {
            self.shuttles.remove(id);
        }

        for destination in self.destinations.values_mut() {
            if destination
                .shuttle
                .is_some_and(|shuttle| removed.contains(&shuttle))
            {
                destination.shuttle = None;
            }
        }

        let mut orphaned = Vec::new();
        self.destinations.retain(|_, destination| {
            if removed.contains(&destination.map) {
                orphaned.extend(destination.shuttle);
                false
            } else {
                true
            }
        });
        orphaned
    }

    /// Drop every hub and shuttle, keeping destinations
    pub fn clear_infrastructure(&mut self) {
        self.hubs.clear();
        self.shuttles.clear();
        for destination in self.destinations.values_mut() {
            destination.shuttle = None;
        }
    }

    pub fn clear(&mut self) {
        self.hubs.clear();
        self.shuttles.clear();
        self.destinations.clear();
    }
}
