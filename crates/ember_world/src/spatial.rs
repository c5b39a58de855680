//! Spatial query seam.
//!
//! Both the interest trackers and the mob agents' aggro scans go through this
//! trait rather than touching registries directly, so the lookup structure
//! can change (grid, R-tree, remote index) without touching the simulation
//! logic. [`LocalWorldView`] is the standard implementation: a composition of
//! the in-process registries with straightforward radius filtering.

use crate::directory::CharacterDirectory;
use crate::drops::{DropRecord, DropRegistry};
use crate::mob::MobEntity;
use crate::npcs::NpcTable;
use crate::registry::EntityRegistry;
use crate::session::SessionRegistry;
use crate::store::NpcSeed;
use crate::types::{CharId, Coord, MapId, ShardId};
use async_trait::async_trait;
use std::sync::Arc;

/// A character seen by a radius query.
#[derive(Debug, Clone)]
pub struct PlayerSighting {
    pub char_id: CharId,
    pub position: Coord,
}

/// Radius queries per AoI category, scoped to one (shard, map).
#[async_trait]
pub trait SpatialQuery: Send + Sync {
    /// Online characters within `radius` of `center`.
    async fn players_near(
        &self,
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    ) -> Vec<PlayerSighting>;

    /// Live mobs within `radius` of `center`.
    async fn mobs_near(
        &self,
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    ) -> Vec<Arc<MobEntity>>;

    /// NPC placements within `radius` of `center`.
    async fn npcs_near(&self, map: MapId, center: Coord, radius: f64) -> Vec<Arc<NpcSeed>>;

    /// Ground drops within `radius` of `center`, claim state included.
    async fn drops_near(
        &self,
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    ) -> Vec<Arc<DropRecord>>;
}

/// The in-process spatial view over the local registries.
pub struct LocalWorldView {
    registry: Arc<EntityRegistry>,
    sessions: Arc<SessionRegistry>,
    npcs: Arc<NpcTable>,
    drops: Arc<DropRegistry>,
    characters: Arc<dyn CharacterDirectory>,
}

impl LocalWorldView {
    /// Composes the view from the process-local registries.
    pub fn new(
        registry: Arc<EntityRegistry>,
        sessions: Arc<SessionRegistry>,
        npcs: Arc<NpcTable>,
        drops: Arc<DropRegistry>,
        characters: Arc<dyn CharacterDirectory>,
    ) -> Arc<Self> {
        Arc::new(Self { registry, sessions, npcs, drops, characters })
    }
}

#[async_trait]
impl SpatialQuery for LocalWorldView {
    async fn players_near(
        &self,
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    ) -> Vec<PlayerSighting> {
        let mut sightings = Vec::new();
        for session in self.sessions.on_map(shard, map) {
            if !session.is_active() || !self.characters.is_alive(session.char_id).await {
                continue;
            }
            let position = session.position().await;
            if position.distance(center) <= radius {
                sightings.push(PlayerSighting { char_id: session.char_id, position });
            }
        }
        sightings
    }

    async fn mobs_near(
        &self,
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    ) -> Vec<Arc<MobEntity>> {
        let mut nearby = Vec::new();
        for mob in self.registry.list_live(shard, map) {
            if mob.position().await.distance(center) <= radius {
                nearby.push(mob);
            }
        }
        nearby
    }

    async fn npcs_near(&self, map: MapId, center: Coord, radius: f64) -> Vec<Arc<NpcSeed>> {
        self.npcs
            .on_map(map)
            .into_iter()
            .filter(|npc| npc.position.distance(center) <= radius)
            .collect()
    }

    async fn drops_near(
        &self,
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    ) -> Vec<Arc<DropRecord>> {
        self.drops
            .on_map(shard, map)
            .into_iter()
            .filter(|drop| drop.position.distance(center) <= radius)
            .collect()
    }
}
