//! Static NPC placements.
//!
//! NPCs never move or die; the table exists so the interest tracker has a
//! category source to diff against. Reloaded wholesale on admin refresh.

use crate::store::NpcSeed;
use crate::types::{MapId, NpcId};
use dashmap::DashMap;
use std::sync::Arc;

/// All NPC placements, keyed by map. NPCs are shard-independent: every shard
/// shows the same placements.
#[derive(Debug, Default)]
pub struct NpcTable {
    by_map: DashMap<MapId, Vec<Arc<NpcSeed>>>,
}

impl NpcTable {
    /// Creates an empty table.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces the whole table from store data.
    pub fn reload(&self, seeds: Vec<NpcSeed>) {
        self.by_map.clear();
        for seed in seeds {
            self.by_map.entry(seed.map).or_default().push(Arc::new(seed));
        }
    }

    /// NPCs standing on one map.
    pub fn on_map(&self, map: MapId) -> Vec<Arc<NpcSeed>> {
        self.by_map.get(&map).map(|v| v.clone()).unwrap_or_default()
    }

    /// Looks up one NPC on a map.
    pub fn get(&self, map: MapId, id: NpcId) -> Option<Arc<NpcSeed>> {
        self.by_map
            .get(&map)
            .and_then(|v| v.iter().find(|n| n.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    #[test]
    fn reload_replaces_placements() {
        let table = NpcTable::new();
        table.reload(vec![NpcSeed {
            id: NpcId(1),
            map: MapId(100),
            name: "gatekeeper".to_string(),
            position: Coord::new(3.0, 4.0),
        }]);
        assert_eq!(table.on_map(MapId(100)).len(), 1);

        table.reload(Vec::new());
        assert!(table.on_map(MapId(100)).is_empty());
    }
}
