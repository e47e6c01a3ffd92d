//! Deciding who rides a jump and who is left behind
//!
//! The scan walks the attachment tree under a shuttle. Token holders are
//! skipped along with everything they carry. Living beings and non-portable
//! entities are picked up whole. Anything else is transparent and searched.
//! Entities matching none of these rules simply stay aboard.

use log::warn;

use super::entity::EntityStore;
use super::types::{EntityId, Transform};

/// An entity that should be left at the jump origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EjectionCandidate {
    pub entity: EntityId,
    /// Transform relative to the scanned root
    pub relative: Transform,
}

/// Collect ejection candidates under `root`, in tree order
pub fn scan(store: &EntityStore, root: EntityId) -> Vec<EjectionCandidate> {
    let mut candidates = Vec::new();
    // Reverse push keeps pre-order with children in insertion order
    let mut stack: Vec<EntityId> = store.children_of(root).iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let Some(entity) = store.get(id) else {
            continue;
        };

        if entity.transit_token.is_some() {
            continue;
        }

        if entity.mob || entity.non_portable {
            if let Some(relative) = store.relative_transform(id, root) {
                candidates.push(EjectionCandidate {
                    entity: id,
                    relative,
                });
            }
            continue;
        }

        stack.extend(entity.children.iter().rev().copied());
    }

    candidates
}

/// Put every candidate down on `origin_map`, where it was before the jump
/// Returns the entities that were moved
pub fn eject(
    store: &mut EntityStore,
    candidates: &[EjectionCandidate],
    origin_map: EntityId,
    origin_transform: &Transform,
) -> Vec<EntityId> {
    let mut ejected = Vec::new();
    for candidate in candidates {
        let target = origin_transform.compose(&candidate.relative);
        match store.reparent(candidate.entity, origin_map, target) {
            Ok(()) => ejected.push(candidate.entity),
            Err(e) => warn!("Failed to eject {:?}: {:#}", candidate.entity, e),
        }
    }
    ejected
}
