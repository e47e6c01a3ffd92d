//! Map and grid blueprints
//!
//! A blueprint is a named tree of entity templates. The library maps resource
//! paths to blueprints so maps (the hub) and grids (shuttles) can be loaded by
//! path the same way they would be read from disk.

use anyhow::{Context, Result};
use std::collections::HashMap;

use super::entity::EntityStore;
use super::types::{EntityId, SpawnPointKind, Transform};

/// Template for one entity and its children
#[derive(Debug, Clone, Default)]
pub struct EntityBlueprint {
    pub name: String,
    pub local: Transform,
    pub mob: bool,
    pub non_portable: bool,
    pub dock_point: bool,
    pub spawn_point: Option<SpawnPointKind>,
    pub children: Vec<EntityBlueprint>,
}

impl EntityBlueprint {
    pub fn new(name: &str, local: Transform) -> Self {
        Self {
            name: name.to_string(),
            local,
            ..Default::default()
        }
    }

    pub fn dock_point(name: &str, local: Transform) -> Self {
        Self {
            dock_point: true,
            ..Self::new(name, local)
        }
    }

    pub fn spawn_point(name: &str, local: Transform, kind: SpawnPointKind) -> Self {
        Self {
            spawn_point: Some(kind),
            ..Self::new(name, local)
        }
    }

    pub fn mob(name: &str, local: Transform) -> Self {
        Self {
            mob: true,
            ..Self::new(name, local)
        }
    }

    pub fn with_child(mut self, child: EntityBlueprint) -> Self {
        self.children.push(child);
        self
    }

    /// Instantiate this template (and its subtree) under `parent`
    pub fn instantiate(&self, store: &mut EntityStore, parent: EntityId) -> Result<EntityId> {
        let id = store.spawn(parent, &self.name, self.local)?;
        {
            let entity = store
                .get_mut(id)
                .context("Freshly spawned entity not found")?;
            entity.mob = self.mob;
            entity.non_portable = self.non_portable;
            entity.spawn_point = self.spawn_point;
        }
        if self.dock_point {
            store.mark_dock_point(id)?;
        }

        for child in &self.children {
            child.instantiate(store, id)?;
        }
        Ok(id)
    }
}

/// Template for a whole map
#[derive(Debug, Clone, Default)]
pub struct MapBlueprint {
    pub name: String,
    pub entities: Vec<EntityBlueprint>,
}

impl MapBlueprint {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, entity: EntityBlueprint) -> Self {
        self.entities.push(entity);
        self
    }
}

/// Resource path -> blueprint lookup
#[derive(Debug, Clone, Default)]
pub struct BlueprintLibrary {
    maps: HashMap<String, MapBlueprint>,
    grids: HashMap<String, EntityBlueprint>,
}

impl BlueprintLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_map(&mut self, path: &str, blueprint: MapBlueprint) {
        self.maps.insert(path.to_string(), blueprint);
    }

    pub fn register_grid(&mut self, path: &str, blueprint: EntityBlueprint) {
        self.grids.insert(path.to_string(), blueprint);
    }

    /// Load a map blueprint into a brand new map
    pub fn load_map(&self, store: &mut EntityStore, path: &str) -> Result<EntityId> {
        let blueprint = self
            .maps
            .get(path)
            .with_context(|| format!("No map blueprint at {}", path))?;

        let map = store.create_map(&blueprint.name);
        for entity in &blueprint.entities {
            if let Err(e) = entity.instantiate(store, map) {
                store.delete(map);
                return Err(e).with_context(|| format!("Failed to load map {}", path));
            }
        }
        Ok(map)
    }

    /// Load a grid blueprint onto an existing map
    pub fn load_grid(
        &self,
        store: &mut EntityStore,
        map: EntityId,
        path: &str,
    ) -> Result<EntityId> {
        let blueprint = self
            .grids
            .get(path)
            .with_context(|| format!("No grid blueprint at {}", path))?;

        blueprint
            .instantiate(store, map)
            .with_context(|| format!("Failed to load grid {}", path))
    }
}
