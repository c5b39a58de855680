//! # Entity Registry
//!
//! Owns the live mob records per (shard, map) and the bounded sight-id pools
//! that address them. Registration happens in bulk at world load and at
//! runtime for admin/dungeon spawns; both paths share the same lock-free map
//! of per-map indexes, so concurrent registration is safe without a global
//! lock.

mod sight;

pub use sight::SightIdPool;

use crate::config::SimConfig;
use crate::error::WorldError;
use crate::mob::{MobEntity, SpawnZone};
use crate::store::WorldStore;
use crate::types::{MapId, ShardId, SightId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Live entities of one (shard, map), plus that map's sight-id pool.
#[derive(Debug)]
pub struct MapIndex {
    live: DashMap<SightId, Arc<MobEntity>>,
    pool: Mutex<SightIdPool>,
}

impl MapIndex {
    fn new(capacity: u32) -> Self {
        Self { live: DashMap::new(), pool: Mutex::new(SightIdPool::new(capacity)) }
    }
}

/// Registry of every live mob across all shards and maps on this process.
#[derive(Debug)]
pub struct EntityRegistry {
    maps: DashMap<(ShardId, MapId), Arc<MapIndex>>,
    config: Arc<SimConfig>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new(config: Arc<SimConfig>) -> Arc<Self> {
        Arc::new(Self { maps: DashMap::new(), config })
    }

    fn index(&self, shard: ShardId, map: MapId) -> Arc<MapIndex> {
        self.maps
            .entry((shard, map))
            .or_insert_with(|| Arc::new(MapIndex::new(self.config.sight_id_capacity)))
            .clone()
    }

    /// Registers one spawn zone on a shard, creating `zone.count` entities at
    /// random points inside the zone rectangle.
    ///
    /// Validates the zone (positive count, valid rect, loadable template) and
    /// returns an error for the caller to log and skip; a bad zone never
    /// aborts world load.
    pub async fn register(
        &self,
        shard: ShardId,
        zone: Arc<SpawnZone>,
        store: &dyn WorldStore,
    ) -> Result<Vec<Arc<MobEntity>>, WorldError> {
        if zone.count == 0 {
            return Err(WorldError::Zone(format!("zone on {} has count 0", zone.map)));
        }
        if !zone.rect.is_valid() {
            return Err(WorldError::Zone(format!("zone on {} has a degenerate rect", zone.map)));
        }
        let template = store
            .mob_template(zone.template)
            .await
            .ok_or(WorldError::TemplateMissing(zone.template))?;

        let index = self.index(shard, zone.map);
        let mut spawned = Vec::with_capacity(zone.count as usize);
        for _ in 0..zone.count {
            let sight_id = {
                let mut pool = index.pool.lock().await;
                pool.allocate().ok_or(WorldError::SightIdExhausted(shard))?
            };
            let position = zone.rect.random_point(&mut rand::thread_rng());
            let entity =
                MobEntity::new(shard, sight_id, zone.clone(), template.clone(), position, false);
            index.live.insert(sight_id, entity.clone());
            spawned.push(entity);
        }
        info!(
            "🐾 Registered {} x {} on {} {} (zone at {:?})",
            zone.count, template.name, shard, zone.map, zone.rect
        );
        Ok(spawned)
    }

    /// Spawns a single mob outside any persistent zone (admin command,
    /// dungeon script). `once` mobs never respawn.
    pub async fn spawn_single(
        &self,
        shard: ShardId,
        zone: Arc<SpawnZone>,
        store: &dyn WorldStore,
        once: bool,
    ) -> Result<Arc<MobEntity>, WorldError> {
        let template = store
            .mob_template(zone.template)
            .await
            .ok_or(WorldError::TemplateMissing(zone.template))?;
        let index = self.index(shard, zone.map);
        let sight_id = {
            let mut pool = index.pool.lock().await;
            pool.allocate().ok_or(WorldError::SightIdExhausted(shard))?
        };
        let position = zone.rect.random_point(&mut rand::thread_rng());
        let entity = MobEntity::new(shard, sight_id, zone, template, position, once);
        index.live.insert(sight_id, entity.clone());
        debug!("🐾 Spawned single {} as {} on {}", entity.template.name, sight_id, shard);
        Ok(entity)
    }

    /// Looks up a live mob by its sight id.
    pub fn lookup(&self, shard: ShardId, map: MapId, sight_id: SightId) -> Option<Arc<MobEntity>> {
        self.maps
            .get(&(shard, map))
            .and_then(|index| index.live.get(&sight_id).map(|e| e.clone()))
    }

    /// All live mobs on one (shard, map).
    pub fn list_live(&self, shard: ShardId, map: MapId) -> Vec<Arc<MobEntity>> {
        self.maps
            .get(&(shard, map))
            .map(|index| index.live.iter().map(|e| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Removes a dead mob from the index so no new observer can find it.
    ///
    /// Does NOT free the sight id yet; that happens in [`Self::recycle`]
    /// after the death path has purged every observer's AoI set.
    pub fn detach(&self, shard: ShardId, map: MapId, sight_id: SightId) {
        if let Some(index) = self.maps.get(&(shard, map)) {
            index.live.remove(&sight_id);
        }
    }

    /// Returns a detached sight id to the pool for lazy reuse.
    pub async fn recycle(&self, shard: ShardId, map: MapId, sight_id: SightId) {
        if let Some(index) = self.maps.get(&(shard, map)) {
            index.pool.lock().await.release(sight_id);
        }
    }

    /// Re-enters a respawning mob into the index under a fresh sight id and
    /// resets its state to full HP at a new random point in its zone rect.
    pub async fn reinsert(&self, entity: &Arc<MobEntity>) -> Result<SightId, WorldError> {
        let index = self.index(entity.shard, entity.zone.map);
        let sight_id = {
            let mut pool = index.pool.lock().await;
            pool.allocate().ok_or(WorldError::SightIdExhausted(entity.shard))?
        };
        entity.set_sight_id(sight_id);
        {
            let mut state = entity.state().await;
            let position = entity.zone.rect.random_point(&mut rand::thread_rng());
            state.hp = entity.template.max_hp;
            state.position = position;
            state.target_position = position;
            state.target = None;
            state.pending_damage.clear();
            state.alive = true;
            state.phase = crate::mob::MobPhase::Spawning;
        }
        index.live.insert(sight_id, entity.clone());
        Ok(sight_id)
    }

    /// Number of live mobs on one (shard, map).
    pub fn live_count(&self, shard: ShardId, map: MapId) -> usize {
        self.maps.get(&(shard, map)).map(|index| index.live.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StaticWorldStore;
    use crate::types::{Faction, MapRect, TemplateId};
    use crate::mob::MobTemplate;
    use std::collections::HashSet;

    fn fixture() -> (Arc<EntityRegistry>, Arc<SpawnZone>, StaticWorldStore) {
        let config = Arc::new(SimConfig::default());
        let registry = EntityRegistry::new(config);
        let zone = Arc::new(SpawnZone {
            map: MapId(100),
            rect: MapRect::new(0.0, 0.0, 10.0, 10.0),
            count: 3,
            respawn_ms: 30_000,
            attackable: true,
            template: TemplateId(1),
        });
        let store = StaticWorldStore::new(
            vec![zone.clone()],
            vec![Arc::new(MobTemplate {
                id: TemplateId(1),
                name: "mushroom".to_string(),
                max_hp: 80,
                faction: Faction(2),
                level: 5,
                walk_speed: 15.0,
                run_speed: 40.0,
                aggro_range: None,
            })],
            Vec::new(),
        );
        (registry, zone, store)
    }

    #[tokio::test]
    async fn register_spawns_count_inside_rect_with_distinct_ids() {
        let (registry, zone, store) = fixture();
        let spawned = registry.register(ShardId(0), zone.clone(), &store).await.expect("register");

        assert_eq!(spawned.len(), 3);
        assert_eq!(registry.live_count(ShardId(0), MapId(100)), 3);

        let mut ids = HashSet::new();
        for mob in &spawned {
            assert!(ids.insert(mob.sight_id()));
            assert!(zone.rect.contains(mob.position().await));
            assert_eq!(mob.hp().await, 80);
        }
    }

    #[tokio::test]
    async fn zero_count_zone_is_rejected() {
        let (registry, zone, store) = fixture();
        let bad = Arc::new(SpawnZone { count: 0, ..(*zone).clone() });
        let result = registry.register(ShardId(0), bad, &store).await;
        assert!(matches!(result, Err(WorldError::Zone(_))));
    }

    #[tokio::test]
    async fn missing_template_is_rejected() {
        let (registry, zone, store) = fixture();
        let bad = Arc::new(SpawnZone { template: TemplateId(999), ..(*zone).clone() });
        let result = registry.register(ShardId(0), bad, &store).await;
        assert!(matches!(result, Err(WorldError::TemplateMissing(_))));
    }

    #[tokio::test]
    async fn detach_hides_recycle_frees() {
        let (registry, zone, store) = fixture();
        let spawned = registry.register(ShardId(0), zone, &store).await.expect("register");
        let sight_id = spawned[0].sight_id();

        registry.detach(ShardId(0), MapId(100), sight_id);
        assert!(registry.lookup(ShardId(0), MapId(100), sight_id).is_none());
        assert_eq!(registry.live_count(ShardId(0), MapId(100)), 2);

        registry.recycle(ShardId(0), MapId(100), sight_id).await;
        let back = registry.reinsert(&spawned[0]).await.expect("reinsert");
        assert!(registry.lookup(ShardId(0), MapId(100), back).is_some());
        assert_eq!(spawned[0].hp().await, 80);
    }

    #[tokio::test]
    async fn sight_ids_stay_distinct_across_shards_and_registrations() {
        let (registry, zone, store) = fixture();
        registry.register(ShardId(0), zone.clone(), &store).await.expect("shard 0");
        registry.register(ShardId(1), zone.clone(), &store).await.expect("shard 1");
        registry.register(ShardId(0), zone, &store).await.expect("shard 0 again");

        for shard in [ShardId(0), ShardId(1)] {
            let live = registry.list_live(shard, MapId(100));
            let ids: HashSet<_> = live.iter().map(|m| m.sight_id()).collect();
            assert_eq!(ids.len(), live.len(), "duplicate sight id on {shard}");
        }
    }
}
