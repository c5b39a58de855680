//! Ground drops and their claim state.
//!
//! A drop is visible to everyone nearby but may carry a claimer: while the
//! claim holds, only the claiming character sees (and may pick up) the drop.
//! Claims expire after the configured TTL, after which the drop is unclaimed
//! and visible to all again.

use crate::types::{CharId, Coord, DropId, MapId, ShardId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Claim {
    holder: CharId,
    expires: Instant,
}

/// One item lying on the ground.
#[derive(Debug)]
pub struct DropRecord {
    /// Drop identity
    pub id: DropId,
    /// Item identity, opaque to the simulation
    pub item: u32,
    /// Where the drop lies
    pub position: Coord,
    claim: Mutex<Option<Claim>>,
}

impl DropRecord {
    /// The character currently holding a live claim, if any.
    pub async fn claimer(&self) -> Option<CharId> {
        let mut claim = self.claim.lock().await;
        match *claim {
            Some(c) if c.expires > Instant::now() => Some(c.holder),
            Some(_) => {
                // Expired; the drop is unclaimed again.
                *claim = None;
                None
            }
            None => None,
        }
    }

    /// Whether `viewer` may currently see this drop.
    pub async fn visible_to(&self, viewer: CharId) -> bool {
        match self.claimer().await {
            Some(holder) => holder == viewer,
            None => true,
        }
    }
}

/// Registry of drops per (shard, map).
#[derive(Debug)]
pub struct DropRegistry {
    maps: DashMap<(ShardId, MapId), Arc<DashMap<DropId, Arc<DropRecord>>>>,
    next_id: AtomicU64,
    claim_ttl: Duration,
}

impl DropRegistry {
    /// Creates a registry whose claims expire after `claim_ttl`.
    pub fn new(claim_ttl: Duration) -> Arc<Self> {
        Arc::new(Self { maps: DashMap::new(), next_id: AtomicU64::new(1), claim_ttl })
    }

    fn map(&self, shard: ShardId, map: MapId) -> Arc<DashMap<DropId, Arc<DropRecord>>> {
        self.maps.entry((shard, map)).or_default().clone()
    }

    /// Places a drop, optionally pre-claimed for the killer.
    pub async fn spawn(
        &self,
        shard: ShardId,
        map: MapId,
        item: u32,
        position: Coord,
        claimer: Option<CharId>,
    ) -> Arc<DropRecord> {
        let id = DropId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(DropRecord {
            id,
            item,
            position,
            claim: Mutex::new(claimer.map(|holder| Claim {
                holder,
                expires: Instant::now() + self.claim_ttl,
            })),
        });
        self.map(shard, map).insert(id, record.clone());
        record
    }

    /// Removes a drop (picked up or swept).
    pub fn remove(&self, shard: ShardId, map: MapId, id: DropId) -> Option<Arc<DropRecord>> {
        self.maps.get(&(shard, map)).and_then(|m| m.remove(&id).map(|(_, r)| r))
    }

    /// All drops on one (shard, map).
    pub fn on_map(&self, shard: ShardId, map: MapId) -> Vec<Arc<DropRecord>> {
        self.maps
            .get(&(shard, map))
            .map(|m| m.iter().map(|r| r.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claimed_drop_is_invisible_to_others() {
        let drops = DropRegistry::new(Duration::from_secs(30));
        let owner = CharId::new();
        let other = CharId::new();
        let drop =
            drops.spawn(ShardId(0), MapId(1), 4021, Coord::default(), Some(owner)).await;

        assert!(drop.visible_to(owner).await);
        assert!(!drop.visible_to(other).await);
    }

    #[tokio::test]
    async fn claim_expires_into_unclaimed() {
        let drops = DropRegistry::new(Duration::from_millis(20));
        let owner = CharId::new();
        let other = CharId::new();
        let drop =
            drops.spawn(ShardId(0), MapId(1), 4021, Coord::default(), Some(owner)).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(drop.claimer().await, None);
        assert!(drop.visible_to(other).await);
    }

    #[tokio::test]
    async fn remove_takes_the_drop_off_the_map() {
        let drops = DropRegistry::new(Duration::from_secs(30));
        let drop = drops.spawn(ShardId(0), MapId(1), 1, Coord::default(), None).await;
        assert_eq!(drops.on_map(ShardId(0), MapId(1)).len(), 1);
        assert!(drops.remove(ShardId(0), MapId(1), drop.id).is_some());
        assert!(drops.on_map(ShardId(0), MapId(1)).is_empty());
    }
}
