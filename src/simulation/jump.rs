//! Jump execution
//!
//! A jump is issued as a [`JumpCommand`]. The entity stays where it is for the
//! startup period, then leaves for a shared transit-space map, which is when
//! [`JumpStarted`] is reported. After the travel duration it is placed at the
//! target. Each phase change happens on a tick boundary.

use log::{debug, warn};
use std::collections::BTreeMap;

use super::entity::EntityStore;
use super::types::{EntityId, Transform};

/// Request to move an entity to a target frame on another map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpCommand {
    pub entity: EntityId,
    pub target_map: EntityId,
    /// Target transform in the target map's frame
    pub target: Transform,
    /// Time spent docked before leaving
    pub startup: f32,
    /// Time spent in transit space
    pub duration: f32,
}

/// Emitted when an entity leaves its origin map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpStarted {
    pub shuttle: EntityId,
    pub origin_map: Option<EntityId>,
    /// The shuttle's transform on the origin map right before it left
    pub origin_transform: Transform,
}

/// Emitted when an entity reaches its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpArrived {
    pub shuttle: EntityId,
    pub map: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpEvent {
    Started(JumpStarted),
    Arrived(JumpArrived),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JumpPhase {
    Starting { depart_at: f32 },
    InTransit { arrive_at: f32 },
}

#[derive(Debug, Clone, Copy)]
struct ActiveJump {
    command: JumpCommand,
    phase: JumpPhase,
}

/// Tracks every jump in progress
#[derive(Debug, Default)]
pub struct JumpDrive {
    active: BTreeMap<EntityId, ActiveJump>,
    transit_space: Option<EntityId>,
}

impl JumpDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a jump
    /// Returns false if the entity is already jumping
    pub fn issue(&mut self, now: f32, command: JumpCommand) -> bool {
        if self.active.contains_key(&command.entity) {
            warn!("{:?} is already jumping, ignoring new jump", command.entity);
            return false;
        }

        debug!(
            "Jump issued for {:?} to map {:?} ({}s startup, {}s travel)",
            command.entity, command.target_map, command.startup, command.duration
        );
        self.active.insert(
            command.entity,
            ActiveJump {
                command,
                phase: JumpPhase::Starting {
                    depart_at: now + command.startup,
                },
            },
        );
        true
    }

    pub fn is_jumping(&self, entity: EntityId) -> bool {
        self.active.contains_key(&entity)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The shared map entities occupy while between maps
    pub fn transit_space(&self) -> Option<EntityId> {
        self.transit_space
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.transit_space = None;
    }

    fn ensure_transit_space(&mut self, store: &mut EntityStore) -> EntityId {
        match self.transit_space {
            Some(space) if store.exists(space) => space,
            _ => {
                let space = store.create_map("Transit space");
                self.transit_space = Some(space);
                space
            }
        }
    }

    /// Move every jump forward to `now`
    pub fn advance(&mut self, store: &mut EntityStore, now: f32) -> Vec<JumpEvent> {
        let mut events = Vec::new();
        let entities: Vec<EntityId> = self.active.keys().copied().collect();

        for entity in entities {
            if !store.exists(entity) {
                debug!("Dropping jump for deleted entity {:?}", entity);
                self.active.remove(&entity);
                continue;
            }

            let Some(mut jump) = self.active.get(&entity).copied() else {
                continue;
            };

            if let JumpPhase::Starting { depart_at } = jump.phase {
                if now < depart_at {
                    continue;
                }

                let origin_map = store.map_of(entity);
                let origin_transform = store.world_transform(entity).unwrap_or_default();
                let space = self.ensure_transit_space(store);
                if let Err(e) = store.reparent(entity, space, Transform::IDENTITY) {
                    warn!("Jump of {:?} failed to depart: {:#}", entity, e);
                    self.active.remove(&entity);
                    continue;
                }

                jump.phase = JumpPhase::InTransit {
                    arrive_at: depart_at + jump.command.duration,
                };
                events.push(JumpEvent::Started(JumpStarted {
                    shuttle: entity,
                    origin_map,
                    origin_transform,
                }));
            }

            if let JumpPhase::InTransit { arrive_at } = jump.phase {
                if now < arrive_at {
                    self.active.insert(entity, jump);
                    continue;
                }

                self.active.remove(&entity);
                let target_map = jump.command.target_map;
                match store.reparent(entity, target_map, jump.command.target) {
                    Ok(()) => events.push(JumpEvent::Arrived(JumpArrived {
                        shuttle: entity,
                        map: target_map,
                    })),
                    Err(e) => warn!("Jump of {:?} failed to arrive: {:#}", entity, e),
                }
            }
        }

        events
    }
}
