//! World-data store seam.
//!
//! Spawn zones, mob templates, and NPC placements come from a persistent
//! store outside the simulation core. The store is consulted at world load
//! and on explicit admin refresh; the simulation hot path never writes
//! through it. The server crate provides a TOML-backed implementation;
//! [`StaticWorldStore`] serves tests and embedded setups.

use crate::error::WorldError;
use crate::mob::{MobTemplate, SpawnZone};
use crate::types::{Coord, MapId, NpcId, TemplateId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A static NPC placement from world data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcSeed {
    /// NPC identity
    pub id: NpcId,
    /// Map the NPC stands on
    pub map: MapId,
    /// Display name carried into appear snapshots
    pub name: String,
    /// Fixed position
    pub position: Coord,
}

/// Read access to static world data.
#[async_trait]
pub trait WorldStore: Send + Sync {
    /// Every spawn zone in the world. Zones apply to all shards.
    async fn spawn_zones(&self) -> Result<Vec<Arc<SpawnZone>>, WorldError>;

    /// Looks up one mob template.
    async fn mob_template(&self, id: TemplateId) -> Option<Arc<MobTemplate>>;

    /// Every static NPC placement.
    async fn npc_seeds(&self) -> Result<Vec<NpcSeed>, WorldError>;
}

/// In-memory store over fixed data. Used by tests and embedded worlds.
#[derive(Debug, Default)]
pub struct StaticWorldStore {
    zones: Vec<Arc<SpawnZone>>,
    templates: HashMap<TemplateId, Arc<MobTemplate>>,
    npcs: Vec<NpcSeed>,
}

impl StaticWorldStore {
    /// Builds a store from the given records.
    pub fn new(
        zones: Vec<Arc<SpawnZone>>,
        templates: Vec<Arc<MobTemplate>>,
        npcs: Vec<NpcSeed>,
    ) -> Self {
        Self {
            zones,
            templates: templates.into_iter().map(|t| (t.id, t)).collect(),
            npcs,
        }
    }
}

#[async_trait]
impl WorldStore for StaticWorldStore {
    async fn spawn_zones(&self) -> Result<Vec<Arc<SpawnZone>>, WorldError> {
        Ok(self.zones.clone())
    }

    async fn mob_template(&self, id: TemplateId) -> Option<Arc<MobTemplate>> {
        self.templates.get(&id).cloned()
    }

    async fn npc_seeds(&self) -> Result<Vec<NpcSeed>, WorldError> {
        Ok(self.npcs.clone())
    }
}
