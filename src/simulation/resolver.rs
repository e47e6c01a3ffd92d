//! Locating the hub and the dock points on either side of the route

use log::warn;

use super::entity::EntityStore;
use super::types::{DockSide, EntityId, Transform};

/// Where a jump should put a shuttle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockTarget {
    pub dock: EntityId,
    pub map: EntityId,
    /// Dock transform in the map frame
    pub transform: Transform,
}

/// Read-only view over the store and the registered hubs
pub struct LocationResolver<'a> {
    store: &'a EntityStore,
    hubs: &'a [EntityId],
}

impl<'a> LocationResolver<'a> {
    pub fn new(store: &'a EntityStore, hubs: &'a [EntityId]) -> Self {
        Self { store, hubs }
    }

    /// The live hub map, if any
    pub fn find_hub(&self) -> Option<EntityId> {
        let mut live = self.hubs.iter().copied().filter(|hub| self.is_hub(*hub));
        let first = live.next()?;
        if live.next().is_some() {
            warn!("More than one transit hub is live, using {:?}", first);
        }
        Some(first)
    }

    fn is_hub(&self, map: EntityId) -> bool {
        self.store.get(map).is_some_and(|entity| entity.hub_marker)
    }

    /// First dock point on the requested side of the route
    pub fn find_dock_point(&self, side: DockSide) -> Option<EntityId> {
        self.store.dock_points().find(|dock| {
            let on_hub = self
                .store
                .map_of(*dock)
                .is_some_and(|map| self.is_hub(map));
            match side {
                DockSide::Hub => on_hub,
                DockSide::Destination => !on_hub,
            }
        })
    }

    /// First dock point living on `map`
    pub fn find_dock_point_on(&self, map: EntityId) -> Option<EntityId> {
        self.store
            .dock_points()
            .find(|dock| self.store.map_of(*dock) == Some(map))
    }

    /// Map and map-frame transform of a dock point
    pub fn dock_target(&self, dock: EntityId) -> Option<DockTarget> {
        Some(DockTarget {
            dock,
            map: self.store.map_of(dock)?,
            transform: self.store.world_transform(dock)?,
        })
    }

    /// Convenience: resolve a side straight to its target
    pub fn resolve(&self, side: DockSide) -> Option<DockTarget> {
        self.find_dock_point(side)
            .and_then(|dock| self.dock_target(dock))
    }
}
