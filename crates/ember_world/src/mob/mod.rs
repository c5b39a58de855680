//! Mob simulation: templates, live entities, combat seam, and the per-mob
//! agent task.

mod agent;
mod combat;
mod entity;
mod template;

pub use agent::{spawn_agents, AgentDeps, MobAgent};
pub use combat::{CombatResolver, DamageOutcome, LevelScaledCombat};
pub use entity::{DamageInstruction, MobEntity, MobPhase, MobState};
pub use template::{MobTemplate, SpawnZone};
