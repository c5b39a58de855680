//! Character directory seam.
//!
//! Mob agents and interest trackers need a handful of facts about characters
//! (position, liveness, faction, the equipped pet) and a way to land mob
//! damage on them. Character state itself (stats, inventory, the pet slot) is
//! owned outside the simulation core; this trait is the boundary.
//! [`SessionDirectory`] is the standard in-process implementation over the
//! session registry plus a profile table.

use crate::session::SessionRegistry;
use crate::types::{CharId, Coord, Faction, PetId};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

/// A character's equipped pet, as the interest tracker needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetInfo {
    /// Pet instance identity
    pub id: PetId,
    /// Display name carried into appear snapshots
    pub name: String,
    /// Dead pets are not announced
    pub alive: bool,
}

/// Facts about characters the simulation needs, plus the damage sink for mob
/// attacks.
#[async_trait]
pub trait CharacterDirectory: Send + Sync {
    /// Current position, or `None` when the character is offline.
    async fn position(&self, char_id: CharId) -> Option<Coord>;

    /// Whether the character is online and not dead.
    async fn is_alive(&self, char_id: CharId) -> bool;

    /// Faction alignment, or `None` when offline.
    async fn faction(&self, char_id: CharId) -> Option<Faction>;

    /// The character's equipped pet, if any.
    async fn equipped_pet(&self, char_id: CharId) -> Option<PetInfo>;

    /// Applies mob damage to the character. Returns HP after application, or
    /// `None` when the character is gone; a silent no-op for the caller.
    async fn apply_damage(&self, char_id: CharId, amount: i32) -> Option<i32>;
}

/// Per-character combat profile held by [`SessionDirectory`].
#[derive(Debug)]
pub struct CharProfile {
    hp: AtomicI32,
    max_hp: i32,
    alive: AtomicBool,
    faction: Faction,
    pet: Option<PetInfo>,
}

impl CharProfile {
    /// Creates a profile at full HP.
    pub fn new(max_hp: i32, faction: Faction, pet: Option<PetInfo>) -> Self {
        Self {
            hp: AtomicI32::new(max_hp),
            max_hp,
            alive: AtomicBool::new(true),
            faction,
            pet,
        }
    }

    /// Current HP.
    pub fn hp(&self) -> i32 {
        self.hp.load(Ordering::Acquire)
    }
}

/// In-process directory: positions come from the session registry, combat
/// facts from a lock-free profile table.
#[derive(Debug)]
pub struct SessionDirectory {
    sessions: Arc<SessionRegistry>,
    profiles: DashMap<CharId, Arc<CharProfile>>,
}

impl SessionDirectory {
    /// Creates a directory over the given session registry.
    pub fn new(sessions: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self { sessions, profiles: DashMap::new() })
    }

    /// Registers a character's combat profile at login.
    pub fn insert_profile(&self, char_id: CharId, profile: CharProfile) {
        self.profiles.insert(char_id, Arc::new(profile));
    }

    /// Drops a character's profile at logout.
    pub fn remove_profile(&self, char_id: CharId) {
        self.profiles.remove(&char_id);
    }

    /// Profile lookup, mainly for tests and admin inspection.
    pub fn profile(&self, char_id: CharId) -> Option<Arc<CharProfile>> {
        self.profiles.get(&char_id).map(|p| p.clone())
    }
}

#[async_trait]
impl CharacterDirectory for SessionDirectory {
    async fn position(&self, char_id: CharId) -> Option<Coord> {
        match self.sessions.by_char(char_id) {
            Some(session) => Some(session.position().await),
            None => None,
        }
    }

    async fn is_alive(&self, char_id: CharId) -> bool {
        self.sessions.by_char(char_id).is_some()
            && self
                .profiles
                .get(&char_id)
                .map(|p| p.alive.load(Ordering::Acquire))
                .unwrap_or(false)
    }

    async fn faction(&self, char_id: CharId) -> Option<Faction> {
        self.profiles.get(&char_id).map(|p| p.faction)
    }

    async fn equipped_pet(&self, char_id: CharId) -> Option<PetInfo> {
        self.profiles.get(&char_id).and_then(|p| p.pet.clone())
    }

    async fn apply_damage(&self, char_id: CharId, amount: i32) -> Option<i32> {
        let profile = self.profiles.get(&char_id)?.clone();
        if !profile.alive.load(Ordering::Acquire) {
            return None;
        }
        let mut current = profile.hp.load(Ordering::Acquire);
        loop {
            let next = (current - amount.max(0)).clamp(0, profile.max_hp);
            match profile.hp.compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    if next == 0 {
                        profile.alive.store(false, Ordering::Release);
                    }
                    return Some(next);
                }
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MapId, ShardId};

    #[tokio::test]
    async fn damage_clamps_and_kills() {
        let sessions = Arc::new(SessionRegistry::new());
        let directory = SessionDirectory::new(sessions.clone());
        let char_id = CharId::new();
        let (_s, _rx) = sessions.open(char_id, ShardId(0), MapId(1), Coord::default());
        directory.insert_profile(char_id, CharProfile::new(50, Faction(1), None));

        assert_eq!(directory.apply_damage(char_id, 30).await, Some(20));
        assert_eq!(directory.apply_damage(char_id, 100).await, Some(0));
        assert!(!directory.is_alive(char_id).await);
        assert_eq!(directory.apply_damage(char_id, 5).await, None);
    }

    #[tokio::test]
    async fn offline_characters_are_absent() {
        let sessions = Arc::new(SessionRegistry::new());
        let directory = SessionDirectory::new(sessions);
        let ghost = CharId::new();
        assert_eq!(directory.position(ghost).await, None);
        assert!(!directory.is_alive(ghost).await);
        assert_eq!(directory.apply_damage(ghost, 10).await, None);
    }
}
