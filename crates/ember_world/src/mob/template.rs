//! Static world data: mob templates and spawn zones.
//!
//! Both are read-mostly records loaded from the world store at startup and on
//! explicit admin refresh; the hot path never writes them.

use crate::types::{Faction, MapId, MapRect, TemplateId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stats shared by every mob stamped from one template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobTemplate {
    /// Template identity referenced by spawn zones
    pub id: TemplateId,
    /// Display name carried into appear snapshots
    pub name: String,
    /// Maximum (and spawn) hit points
    pub max_hp: i32,
    /// Faction alignment; hostile toward any differing faction
    pub faction: Faction,
    /// Level, forwarded to the combat collaborator
    pub level: u16,
    /// Movement speed while wandering (units/second)
    pub walk_speed: f64,
    /// Movement speed while chasing (units/second)
    pub run_speed: f64,
    /// Per-template override of the global aggro range
    #[serde(default)]
    pub aggro_range: Option<f64>,
}

/// Where and how many instances of a template spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnZone {
    /// Map the zone belongs to
    pub map: MapId,
    /// Bounding rectangle mobs spawn and wander inside
    pub rect: MapRect,
    /// Number of simultaneous live instances
    pub count: u32,
    /// Delay between a death and the replacement spawn (milliseconds)
    pub respawn_ms: u64,
    /// Whether players may attack mobs of this zone
    pub attackable: bool,
    /// Template the zone stamps its mobs from
    pub template: TemplateId,
}

impl SpawnZone {
    /// Respawn delay as a [`Duration`].
    pub fn respawn(&self) -> Duration {
        Duration::from_millis(self.respawn_ms)
    }
}
