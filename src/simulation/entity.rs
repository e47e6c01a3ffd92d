//! Live spatial entities
//!
//! A flat store of entities arranged into attachment trees. Every tree root is
//! a map; grids, actors and markers hang below it. A parent exclusively owns
//! the ordered list of its children.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};

use super::types::{EntityId, SimId, SpawnPointKind, Transform};

/// Marker meaning "this actor is owed one trip from the hub"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitToken {
    /// Simulation time at which the token was granted
    pub granted_at: f32,
}

/// An entity in the simulation
#[derive(Debug, Clone)]
pub struct SimEntity {
    pub id: EntityId,
    pub name: String,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    /// Transform relative to the parent (or the map origin for maps)
    pub local: Transform,
    /// Living being
    pub mob: bool,
    /// Explicitly blacklisted from riding the shuttle
    pub non_portable: bool,
    /// Carried by the hub map
    pub hub_marker: bool,
    /// Structural damage is disabled. Set here, honoured by whoever applies damage
    pub protected: bool,
    pub dock_point: bool,
    pub spawn_point: Option<SpawnPointKind>,
    /// Nobody may pilot this grid manually. Set here, honoured by the piloting code
    pub pilot_locked: bool,
    pub transit_token: Option<TransitToken>,
}

impl SimEntity {
    fn new(id: EntityId, name: &str, parent: Option<EntityId>, local: Transform) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local,
            mob: false,
            non_portable: false,
            hub_marker: false,
            protected: false,
            dock_point: false,
            spawn_point: None,
            pilot_locked: false,
            transit_token: None,
        }
    }
}

/// Owner of every live entity
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, SimEntity>,
    /// Index of entities flagged as dock points
    dock_points: BTreeSet<EntityId>,
    next_id: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    /// Create an empty map
    pub fn create_map(&mut self, name: &str) -> EntityId {
        let id = self.next_entity_id();
        self.entities
            .insert(id, SimEntity::new(id, name, None, Transform::IDENTITY));
        id
    }

    /// Spawn a new entity attached to `parent`
    pub fn spawn(&mut self, parent: EntityId, name: &str, local: Transform) -> Result<EntityId> {
        if !self.entities.contains_key(&parent) {
            bail!("Parent entity {:?} not found", parent);
        }

        let id = self.next_entity_id();
        self.entities
            .insert(id, SimEntity::new(id, name, Some(parent), local));
        self.entities
            .get_mut(&parent)
            .context("Parent entity vanished during spawn")?
            .children
            .push(id);
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&SimEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut SimEntity> {
        self.entities.get_mut(&id)
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ordered children of an entity (empty if it doesn't exist)
    pub fn children_of(&self, id: EntityId) -> &[EntityId] {
        self.entities
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Flag an entity as a dock point and index it
    pub fn mark_dock_point(&mut self, id: EntityId) -> Result<()> {
        let entity = self.get_mut(id).context("Dock point entity not found")?;
        entity.dock_point = true;
        self.dock_points.insert(id);
        Ok(())
    }

    /// All live dock points in creation order
    pub fn dock_points(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.dock_points.iter().copied()
    }

    /// The map (tree root) an entity currently lives on
    pub fn map_of(&self, id: EntityId) -> Option<EntityId> {
        let mut current = self.entities.get(&id)?;
        while let Some(parent) = current.parent {
            current = self.entities.get(&parent)?;
        }
        Some(current.id)
    }

    /// Whether `ancestor` is `id` or one of its parents
    pub fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.entities.get(&cur).and_then(|e| e.parent);
        }
        false
    }

    /// Transform of `id` expressed in the frame of `ancestor`
    pub fn relative_transform(&self, id: EntityId, ancestor: EntityId) -> Option<Transform> {
        let mut chain = Vec::new();
        let mut current = self.entities.get(&id)?;
        while current.id != ancestor {
            chain.push(current.local);
            current = self.entities.get(&current.parent?)?;
        }

        Some(
            chain
                .iter()
                .rev()
                .fold(Transform::IDENTITY, |acc, local| acc.compose(local)),
        )
    }

    /// Transform of `id` expressed in its map's frame
    pub fn world_transform(&self, id: EntityId) -> Option<Transform> {
        let map = self.map_of(id)?;
        self.relative_transform(id, map)
    }

    /// All spawn points of the given kind on a map, in creation order
    pub fn spawn_points(&self, map: EntityId, kind: SpawnPointKind) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.spawn_point == Some(kind) && self.map_of(e.id) == Some(map))
            .map(|e| e.id)
            .collect()
    }

    /// Detach `id` from its parent and attach it under `new_parent` at `local`
    pub fn reparent(&mut self, id: EntityId, new_parent: EntityId, local: Transform) -> Result<()> {
        if !self.entities.contains_key(&id) {
            bail!("Entity {:?} not found", id);
        }
        if !self.entities.contains_key(&new_parent) {
            bail!("New parent {:?} not found", new_parent);
        }
        if self.is_ancestor(id, new_parent) {
            bail!("Cannot attach {:?} inside its own subtree", id);
        }

        let old_parent = self.entities.get(&id).and_then(|e| e.parent);
        if let Some(old_parent) = old_parent {
            if let Some(parent) = self.entities.get_mut(&old_parent) {
                parent.children.retain(|child| *child != id);
            }
        }

        if let Some(parent) = self.entities.get_mut(&new_parent) {
            parent.children.push(id);
        }

        let entity = self.entities.get_mut(&id).context("Entity vanished during reparent")?;
        entity.parent = Some(new_parent);
        entity.local = local;
        Ok(())
    }

    /// Delete an entity and its whole subtree
    /// Returns every removed ID (empty if it didn't exist)
    pub fn delete(&mut self, id: EntityId) -> Vec<EntityId> {
        let Some(entity) = self.entities.get(&id) else {
            return Vec::new();
        };

        if let Some(parent) = entity.parent {
            if let Some(parent) = self.entities.get_mut(&parent) {
                parent.children.retain(|child| *child != id);
            }
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(entity) = self.entities.remove(&current) {
                self.dock_points.remove(&current);
                stack.extend(entity.children);
                removed.push(current);
            }
        }
        removed
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entities.clear();
        self.dock_points.clear();
    }
}
