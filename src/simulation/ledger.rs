//! Registration ledger for transit tokens
//!
//! The token itself lives on the actor entity. The ledger keeps an index of
//! who holds one so the post-departure sweep doesn't scan every entity.

use log::debug;
use std::collections::BTreeSet;

use super::entity::{EntityStore, TransitToken};
use super::types::EntityId;

#[derive(Debug, Default)]
pub struct RegistrationLedger {
    holders: BTreeSet<EntityId>,
}

impl RegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a token to `actor`
    /// Returns false if the actor already holds one or doesn't exist
    pub fn grant(&mut self, store: &mut EntityStore, actor: EntityId, now: f32) -> bool {
        let Some(entity) = store.get_mut(actor) else {
            return false;
        };
        if entity.transit_token.is_some() {
            return false;
        }

        entity.transit_token = Some(TransitToken { granted_at: now });
        self.holders.insert(actor);
        true
    }

    /// Remove the token from `actor`
    /// Returns false if there was nothing to remove
    pub fn revoke(&mut self, store: &mut EntityStore, actor: EntityId) -> bool {
        self.holders.remove(&actor);
        store
            .get_mut(actor)
            .and_then(|entity| entity.transit_token.take())
            .is_some()
    }

    pub fn holds(&self, store: &EntityStore, actor: EntityId) -> bool {
        store
            .get(actor)
            .is_some_and(|entity| entity.transit_token.is_some())
    }

    /// Indexed token holders in ID order
    pub fn holders(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.holders.iter().copied()
    }

    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    /// Drop deleted entities from the index
    pub fn forget(&mut self, removed: &[EntityId]) {
        for id in removed {
            self.holders.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.holders.clear();
    }

    /// Revoke the token of every holder that is no longer on the hub map
    /// Returns the revoked actors
    pub fn sweep_departed(&mut self, store: &mut EntityStore, hub_map: EntityId) -> Vec<EntityId> {
        let holders: Vec<EntityId> = self.holders.iter().copied().collect();
        let mut revoked = Vec::new();

        for actor in holders {
            match store.map_of(actor) {
                Some(map) if map == hub_map => continue,
                Some(_) => {
                    if self.revoke(store, actor) {
                        revoked.push(actor);
                    }
                }
                None => {
                    // Deleted without going through forget()
                    self.holders.remove(&actor);
                }
            }
        }

        if !revoked.is_empty() {
            debug!("Revoked {} transit tokens after departure", revoked.len());
        }
        revoked
    }
}
