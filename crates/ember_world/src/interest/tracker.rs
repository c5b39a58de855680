//! # Interest Tracker
//!
//! One scan loop per active session. Each cycle queries the five AoI
//! categories around the character, diffs against the session's interest
//! state, and publishes appear/disappear events for the differences. Dead
//! entities and drops claimed by someone else are treated as absent even when
//! geometrically near.

use super::state::CategorySet;
use crate::bus::{BroadcastBus, BroadcastEvent};
use crate::config::SimConfig;
use crate::directory::CharacterDirectory;
use crate::error::WorldError;
use crate::events::{AppearEvent, DisappearEvent};
use crate::registry::EntityRegistry;
use crate::session::Session;
use crate::spatial::SpatialQuery;
use crate::types::{CharId, DisplayToken, EntityRef};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shared collaborators handed to every tracker on this process.
pub struct TrackerDeps {
    pub config: Arc<SimConfig>,
    pub registry: Arc<EntityRegistry>,
    pub spatial: Arc<dyn SpatialQuery>,
    pub characters: Arc<dyn CharacterDirectory>,
    pub bus: Arc<BroadcastBus>,
}

/// The AoI scan task of one session.
pub struct InterestTracker {
    session: Arc<Session>,
    deps: Arc<TrackerDeps>,
}

impl InterestTracker {
    /// Spawns the tracker task for a session. The task exits when the
    /// session's liveness flag clears.
    pub fn spawn(session: Arc<Session>, deps: Arc<TrackerDeps>) -> JoinHandle<()> {
        let tracker = Self { session, deps };
        tokio::spawn(async move { tracker.run().await })
    }

    async fn run(self) {
        debug!("👁 Tracker started for character {}", self.session.char_id);
        loop {
            // Liveness check at the top of each cycle.
            if !self.session.is_active() {
                break;
            }
            if let Err(e) = self.scan().await {
                warn!("🟡 Tracker scan fault for {}: {}", self.session.char_id, e);
            }
            tokio::time::sleep(self.deps.config.tracker_interval()).await;
        }
        debug!("👁 Tracker exited for character {}", self.session.char_id);
    }

    async fn scan(&self) -> Result<(), WorldError> {
        let viewer = self.session.char_id;
        let center = self.session.position().await;
        let radius = self.deps.config.visibility_radius;
        let shard = self.session.shard;
        let map = self.session.map;

        // Players: everyone else nearby, online and alive.
        let mut players: HashMap<CharId, (DisplayToken, serde_json::Value)> = HashMap::new();
        for sighting in self.deps.spatial.players_near(shard, map, center, radius).await {
            if sighting.char_id == viewer {
                continue;
            }
            let token = DisplayToken(sighting.char_id.0.as_u64_pair().0);
            let snapshot = serde_json::json!({
                "char_id": sighting.char_id,
                "position": sighting.position,
            });
            players.insert(sighting.char_id, (token, snapshot));
        }
        self.diff_category(&self.session.interest.players, players, EntityRef::Player)
            .await;

        // Mobs: live only; dead mobs are absent even when their record is
        // still mid-teardown.
        let mut mobs = HashMap::new();
        let mut appeared_mobs = Vec::new();
        for mob in self.deps.spatial.mobs_near(shard, map, center, radius).await {
            if !mob.is_alive().await {
                continue;
            }
            let token = DisplayToken(u64::from(mob.sight_id().0));
            mobs.insert(mob.sight_id(), (token, mob.snapshot().await));
            appeared_mobs.push(mob);
        }
        let (new_mobs, gone_mobs) = self
            .diff_category(&self.session.interest.mobs, mobs, EntityRef::Mob)
            .await;
        // Observer bookkeeping so a dying mob can purge exactly the sessions
        // that saw it.
        for mob in appeared_mobs {
            if new_mobs.contains(&mob.sight_id()) {
                mob.add_observer(viewer).await;
            }
        }
        for sight_id in gone_mobs {
            if let Some(mob) = self.deps.registry.lookup(shard, map, sight_id) {
                mob.remove_observer(viewer).await;
            }
        }

        // NPCs: static placements.
        let mut npcs = HashMap::new();
        for npc in self.deps.spatial.npcs_near(map, center, radius).await {
            let token = DisplayToken(u64::from(npc.id.0));
            let snapshot = serde_json::json!({
                "id": npc.id,
                "name": npc.name,
                "position": npc.position,
            });
            npcs.insert(npc.id, (token, snapshot));
        }
        self.diff_category(&self.session.interest.npcs, npcs, EntityRef::Npc)
            .await;

        // Drops: a claim by someone else makes the drop absent for this
        // viewer until the claim expires.
        let mut drops = HashMap::new();
        for drop in self.deps.spatial.drops_near(shard, map, center, radius).await {
            if !drop.visible_to(viewer).await {
                continue;
            }
            let token = DisplayToken(drop.id.0);
            let snapshot = serde_json::json!({
                "id": drop.id,
                "item": drop.item,
                "position": drop.position,
            });
            drops.insert(drop.id, (token, snapshot));
        }
        self.diff_category(&self.session.interest.drops, drops, EntityRef::Drop)
            .await;

        // Pets: derived from nearby owners' equipped-pet slots, never from a
        // standalone registry. players_near already filters owners to
        // online + alive.
        let mut pets = HashMap::new();
        for sighting in self.deps.spatial.players_near(shard, map, center, radius).await {
            if let Some(pet) = self.deps.characters.equipped_pet(sighting.char_id).await {
                if !pet.alive {
                    continue;
                }
                let token = DisplayToken(pet.id.0.as_u64_pair().0);
                let snapshot = serde_json::json!({
                    "id": pet.id,
                    "name": pet.name,
                    "owner": sighting.char_id,
                    "position": sighting.position,
                });
                pets.insert(pet.id, (token, snapshot));
            }
        }
        self.diff_category(&self.session.interest.pets, pets, EntityRef::Pet)
            .await;

        Ok(())
    }

    /// Diffs one category set against the freshly-queried presence map,
    /// publishing one appear per new id and one disappear per vanished id.
    /// Returns (newly appeared, newly gone).
    async fn diff_category<K, F>(
        &self,
        set: &CategorySet<K>,
        present: HashMap<K, (DisplayToken, serde_json::Value)>,
        to_ref: F,
    ) -> (Vec<K>, Vec<K>)
    where
        K: std::hash::Hash + Eq + Copy,
        F: Fn(K) -> EntityRef,
    {
        let viewer = self.session.char_id;
        let mut appeared = Vec::new();
        let mut gone = Vec::new();

        for (id, (token, snapshot)) in &present {
            if set.insert(*id, *token).await {
                appeared.push(*id);
                let event = AppearEvent {
                    viewer,
                    entity: to_ref(*id),
                    token: *token,
                    snapshot: snapshot.clone(),
                };
                self.publish_to_viewer(&event);
            }
        }

        for id in set.ids().await {
            if !present.contains_key(&id) && set.remove(id).await {
                gone.push(id);
                let event = DisappearEvent { viewer, entity: to_ref(id) };
                self.publish_to_viewer(&event);
            }
        }

        (appeared, gone)
    }

    fn publish_to_viewer<T: crate::events::Event>(&self, event: &T) {
        match BroadcastEvent::to_character(self.session.char_id, event) {
            Ok(broadcast) => {
                if let Err(e) = self.deps.bus.publish(broadcast) {
                    warn!("🟡 Tracker publish failed for {}: {}", self.session.char_id, e);
                }
            }
            Err(e) => warn!("🟡 Tracker encode failed for {}: {}", self.session.char_id, e),
        }
    }
}
