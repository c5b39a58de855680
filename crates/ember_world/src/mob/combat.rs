//! Combat resolution seam.
//!
//! Damage formulas live outside the simulation core. An attacking agent asks
//! the resolver what one blow against its target is worth; the core applies
//! the clamped HP change and publishes the event.

use super::entity::MobEntity;
use crate::types::CharId;
use async_trait::async_trait;

/// Result of resolving one mob attack.
#[derive(Debug, Clone, Copy)]
pub struct DamageOutcome {
    /// Damage to apply to the target
    pub amount: i32,
}

/// External combat collaborator.
#[async_trait]
pub trait CombatResolver: Send + Sync {
    /// Resolves one attack tick of `mob` against `target`.
    ///
    /// `None` means the attack fizzled (miss, immunity, target unknown to the
    /// combat service); the agent treats it as a no-op.
    async fn mob_attack(&self, mob: &MobEntity, target: CharId) -> Option<DamageOutcome>;
}

/// Stand-in resolver: flat base damage scaled by mob level.
#[derive(Debug, Clone)]
pub struct LevelScaledCombat {
    /// Damage before the level term
    pub base_damage: i32,
}

impl Default for LevelScaledCombat {
    fn default() -> Self {
        Self { base_damage: 10 }
    }
}

#[async_trait]
impl CombatResolver for LevelScaledCombat {
    async fn mob_attack(&self, mob: &MobEntity, _target: CharId) -> Option<DamageOutcome> {
        Some(DamageOutcome { amount: self.base_damage + i32::from(mob.template.level) * 2 })
    }
}
