//! Simulation tuning parameters.
//!
//! All timings are stored as milliseconds so the structure deserializes
//! directly from the server's TOML configuration; accessor methods convert to
//! [`Duration`] at the call sites.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_wander_tick_ms() -> u64 {
    1000
}
fn default_combat_tick_ms() -> u64 {
    400
}
fn default_tracker_interval_ms() -> u64 {
    1000
}
fn default_attack_commit_ms() -> u64 {
    250
}
fn default_visibility_radius() -> f64 {
    900.0
}
fn default_aggro_range() -> f64 {
    250.0
}
fn default_attack_range() -> f64 {
    60.0
}
fn default_leash_distance() -> f64 {
    400.0
}
fn default_sight_id_capacity() -> u32 {
    10_000
}
fn default_drop_claim_ttl_ms() -> u64 {
    30_000
}

/// Tuning knobs for the simulation core.
///
/// A mob agent ticks at `wander_tick_ms` while idle and at the faster
/// `combat_tick_ms` while chasing or attacking. `leash_distance` is the
/// explicit max-distance-from-spawn-rect policy applied on every map: a
/// chasing mob farther than this from its zone rectangle snaps back inside
/// and drops its target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Agent tick interval while Wandering (milliseconds)
    #[serde(default = "default_wander_tick_ms")]
    pub wander_tick_ms: u64,
    /// Agent tick interval while Chasing or Attacking (milliseconds)
    #[serde(default = "default_combat_tick_ms")]
    pub combat_tick_ms: u64,
    /// Interest tracker scan interval (milliseconds)
    #[serde(default = "default_tracker_interval_ms")]
    pub tracker_interval_ms: u64,
    /// Delay between an attack landing and its damage commit (milliseconds)
    #[serde(default = "default_attack_commit_ms")]
    pub attack_commit_ms: u64,
    /// Radius of the per-player visibility rule (map units)
    #[serde(default = "default_visibility_radius")]
    pub visibility_radius: f64,
    /// Distance at which a hostile player triggers Chasing (map units)
    #[serde(default = "default_aggro_range")]
    pub aggro_range: f64,
    /// Distance at which a chasing mob starts Attacking (map units)
    #[serde(default = "default_attack_range")]
    pub attack_range: f64,
    /// Max distance from the spawn rect before a chasing mob snaps back
    #[serde(default = "default_leash_distance")]
    pub leash_distance: f64,
    /// Size of the bounded per-shard sight-id pool
    #[serde(default = "default_sight_id_capacity")]
    pub sight_id_capacity: u32,
    /// How long a drop stays reserved for its claimer (milliseconds)
    #[serde(default = "default_drop_claim_ttl_ms")]
    pub drop_claim_ttl_ms: u64,
}

impl SimConfig {
    /// Tick interval for a wandering agent.
    pub fn wander_tick(&self) -> Duration {
        Duration::from_millis(self.wander_tick_ms)
    }

    /// Tick interval for a chasing or attacking agent.
    pub fn combat_tick(&self) -> Duration {
        Duration::from_millis(self.combat_tick_ms)
    }

    /// Scan interval for interest trackers.
    pub fn tracker_interval(&self) -> Duration {
        Duration::from_millis(self.tracker_interval_ms)
    }

    /// Cast delay before an attack's damage commit fires.
    pub fn attack_commit(&self) -> Duration {
        Duration::from_millis(self.attack_commit_ms)
    }

    /// How long a drop claim is honored before the drop becomes unclaimed.
    pub fn drop_claim_ttl(&self) -> Duration {
        Duration::from_millis(self.drop_claim_ttl_ms)
    }

    /// Validates the configuration for consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.visibility_radius <= 0.0 {
            return Err("visibility_radius must be positive".to_string());
        }
        if self.aggro_range <= 0.0 || self.attack_range <= 0.0 {
            return Err("aggro_range and attack_range must be positive".to_string());
        }
        if self.attack_range > self.aggro_range {
            return Err("attack_range must not exceed aggro_range".to_string());
        }
        if self.leash_distance <= 0.0 {
            return Err("leash_distance must be positive".to_string());
        }
        if self.sight_id_capacity == 0 {
            return Err("sight_id_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            wander_tick_ms: default_wander_tick_ms(),
            combat_tick_ms: default_combat_tick_ms(),
            tracker_interval_ms: default_tracker_interval_ms(),
            attack_commit_ms: default_attack_commit_ms(),
            visibility_radius: default_visibility_radius(),
            aggro_range: default_aggro_range(),
            attack_range: default_attack_range(),
            leash_distance: default_leash_distance(),
            sight_id_capacity: default_sight_id_capacity(),
            drop_claim_ttl_ms: default_drop_claim_ttl_ms(),
        }
    }
}
