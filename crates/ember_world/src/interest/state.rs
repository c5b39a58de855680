//! Per-player area-of-interest state.
//!
//! Five category sets, each behind its own lock so unrelated categories never
//! contend: a tracker diffing mobs does not block near-cast evaluation that
//! only needs the players set.

use crate::types::{CharId, DisplayToken, DropId, EntityRef, NpcId, PetId, SightId};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// One independently-locked AoI category: entity id → display token.
///
/// The display token is whatever handle the tracker stored when it announced
/// the entity, so later diffs know what the client was last told.
#[derive(Debug)]
pub struct CategorySet<K: std::hash::Hash + Eq + Copy> {
    entries: Mutex<HashMap<K, DisplayToken>>,
}

impl<K: std::hash::Hash + Eq + Copy> Default for CategorySet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: std::hash::Hash + Eq + Copy> CategorySet<K> {
    /// Creates an empty category set.
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Marks `id` present. Returns true when it was newly inserted; the
    /// insertion is the dedup point for "exactly one appear event".
    pub async fn insert(&self, id: K, token: DisplayToken) -> bool {
        self.entries.lock().await.insert(id, token).is_none()
    }

    /// Removes `id`. Returns true when it was present; the removal is the
    /// dedup point for "exactly one disappear event".
    pub async fn remove(&self, id: K) -> bool {
        self.entries.lock().await.remove(&id).is_some()
    }

    /// Returns true when `id` is currently on sight.
    pub async fn contains(&self, id: K) -> bool {
        self.entries.lock().await.contains_key(&id)
    }

    /// Snapshot of the currently-present ids.
    pub async fn ids(&self) -> Vec<K> {
        self.entries.lock().await.keys().copied().collect()
    }

    /// Number of entities on sight in this category.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Empties the category, returning the ids that were present.
    pub async fn drain(&self) -> Vec<K> {
        self.entries.lock().await.drain().map(|(k, _)| k).collect()
    }
}

/// Everything one active character currently has on sight, split by category.
///
/// Membership mirrors "within the visibility rule as of the last tracker
/// tick", with at most one tick of staleness.
#[derive(Debug, Default)]
pub struct PlayerInterestState {
    /// Other characters on sight
    pub players: CategorySet<CharId>,
    /// Live mobs on sight, by sight id
    pub mobs: CategorySet<SightId>,
    /// NPC placements on sight
    pub npcs: CategorySet<NpcId>,
    /// Ground drops on sight
    pub drops: CategorySet<DropId>,
    /// Pets on sight
    pub pets: CategorySet<PetId>,
}

impl PlayerInterestState {
    /// Creates an empty interest state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the referenced entity is in any category set.
    ///
    /// This is the membership test near-cast targeting evaluates on the
    /// receiving side.
    pub async fn contains(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Player(id) => self.players.contains(*id).await,
            EntityRef::Mob(id) => self.mobs.contains(*id).await,
            EntityRef::Npc(id) => self.npcs.contains(*id).await,
            EntityRef::Drop(id) => self.drops.contains(*id).await,
            EntityRef::Pet(id) => self.pets.contains(*id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_is_idempotent_dedup_point() {
        let set: CategorySet<SightId> = CategorySet::new();
        assert!(set.insert(SightId(1), DisplayToken(1)).await);
        assert!(!set.insert(SightId(1), DisplayToken(1)).await);
        assert_eq!(set.len().await, 1);
    }

    #[tokio::test]
    async fn remove_reports_prior_presence() {
        let set: CategorySet<SightId> = CategorySet::new();
        set.insert(SightId(2), DisplayToken(2)).await;
        assert!(set.remove(SightId(2)).await);
        assert!(!set.remove(SightId(2)).await);
    }

    #[tokio::test]
    async fn contains_spans_categories() {
        let state = PlayerInterestState::new();
        let viewer = CharId::new();
        state.players.insert(viewer, DisplayToken(9)).await;
        state.mobs.insert(SightId(4), DisplayToken(4)).await;

        assert!(state.contains(&EntityRef::Player(viewer)).await);
        assert!(state.contains(&EntityRef::Mob(SightId(4))).await);
        assert!(!state.contains(&EntityRef::Mob(SightId(5))).await);
        assert!(!state.contains(&EntityRef::Drop(DropId(1))).await);
    }
}
