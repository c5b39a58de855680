//! The live mob record.
//!
//! Every mob owns its mutable simulation state behind one entity-local lock.
//! Only the owning agent task mutates that state, with a single exception:
//! externally-computed damage lands through [`MobEntity::apply_damage`], which
//! acquires the same lock, clamps HP, and queues a damage instruction for the
//! agent to publish on its next tick. The movement/action token invalidates
//! delayed commits that were scheduled before a newer action superseded them.

use super::template::{MobTemplate, SpawnZone};
use crate::types::{CharId, Coord, Faction, MobId, ShardId, SightId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Behavior phase of a mob agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobPhase {
    /// Being placed into the world
    Spawning,
    /// Strolling between random points inside the zone rect
    Wandering,
    /// Running toward a hostile target's last known coordinate
    Chasing,
    /// In attack range, trading blows
    Attacking,
    /// Killed; mid-teardown
    Dead,
    /// Waiting out the zone's respawn timer
    Respawning,
}

/// One externally-applied damage row, drained by the agent each tick so the
/// matching damage events are published from the owning task.
#[derive(Debug, Clone, Copy)]
pub struct DamageInstruction {
    /// Character that dealt the damage
    pub attacker: CharId,
    /// Amount after external combat resolution
    pub amount: i32,
    /// Mob HP after the clamped application
    pub hp_after: i32,
}

/// Mutable simulation state, owned by the agent task.
#[derive(Debug)]
pub struct MobState {
    /// Current behavior phase
    pub phase: MobPhase,
    /// Current hit points; invariant 0 <= hp <= template.max_hp
    pub hp: i32,
    /// Current position
    pub position: Coord,
    /// Where the mob is currently headed
    pub target_position: Coord,
    /// Character being chased or attacked
    pub target: Option<CharId>,
    /// Damage rows applied since the last tick, pending publication
    pub pending_damage: Vec<DamageInstruction>,
    /// False once HP reached zero; reset on respawn
    pub alive: bool,
}

/// A live mob.
///
/// Shared immutable identity plus the lock-guarded [`MobState`]. The sight id
/// is atomic because it changes across respawns while readers (index lookups,
/// snapshots) take it without the state lock.
#[derive(Debug)]
pub struct MobEntity {
    /// Permanent storage identity
    pub id: MobId,
    /// Shard the mob lives on
    pub shard: ShardId,
    /// Spawn zone the mob belongs to
    pub zone: Arc<SpawnZone>,
    /// Template stats
    pub template: Arc<MobTemplate>,
    /// Once-only mobs are discarded permanently on death instead of respawning
    pub once: bool,
    sight_id: AtomicU32,
    state: Mutex<MobState>,
    token: AtomicU64,
    observers: Mutex<HashSet<CharId>>,
    death_notify: Notify,
}

impl MobEntity {
    /// Creates a mob at a position with full HP, ready for its agent task.
    pub fn new(
        shard: ShardId,
        sight_id: SightId,
        zone: Arc<SpawnZone>,
        template: Arc<MobTemplate>,
        position: Coord,
        once: bool,
    ) -> Arc<Self> {
        let hp = template.max_hp;
        Arc::new(Self {
            id: MobId::new(),
            shard,
            zone,
            template,
            once,
            sight_id: AtomicU32::new(sight_id.0),
            state: Mutex::new(MobState {
                phase: MobPhase::Spawning,
                hp,
                position,
                target_position: position,
                target: None,
                pending_damage: Vec::new(),
                alive: true,
            }),
            token: AtomicU64::new(0),
            observers: Mutex::new(HashSet::new()),
            death_notify: Notify::new(),
        })
    }

    /// Current sight id. Only meaningful while the mob is in the map index.
    pub fn sight_id(&self) -> SightId {
        SightId(self.sight_id.load(Ordering::Acquire))
    }

    pub(crate) fn set_sight_id(&self, sight_id: SightId) {
        self.sight_id.store(sight_id.0, Ordering::Release);
    }

    /// Faction, from the template.
    pub fn faction(&self) -> Faction {
        self.template.faction
    }

    /// Locks and returns the mutable state. Owning-agent use, plus the
    /// external damage path below.
    pub async fn state(&self) -> tokio::sync::MutexGuard<'_, MobState> {
        self.state.lock().await
    }

    /// Current position without holding the lock across awaits.
    pub async fn position(&self) -> Coord {
        self.state.lock().await.position
    }

    /// Current HP.
    pub async fn hp(&self) -> i32 {
        self.state.lock().await.hp
    }

    /// Whether the mob has not died.
    pub async fn is_alive(&self) -> bool {
        self.state.lock().await.alive
    }

    /// Current movement/action token.
    pub fn token(&self) -> u64 {
        self.token.load(Ordering::Acquire)
    }

    /// Regenerates the token. Every new action calls this; any delayed commit
    /// still carrying the previous value becomes a no-op.
    pub fn bump_token(&self) -> u64 {
        self.token.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns true when `token` is still the current one.
    pub fn token_matches(&self, token: u64) -> bool {
        self.token() == token
    }

    /// Applies externally-computed damage under the entity lock.
    ///
    /// Clamps HP into [0, max_hp], queues the damage instruction for the
    /// agent, and wakes the agent immediately when this blow was lethal.
    /// Returns the HP after application, or `None` when the mob was already
    /// dead; the caller treats that as a silent no-op.
    pub async fn apply_damage(&self, attacker: CharId, amount: i32) -> Option<i32> {
        let mut state = self.state.lock().await;
        if !state.alive {
            return None;
        }
        let hp_after = (state.hp - amount.max(0)).clamp(0, self.template.max_hp);
        state.hp = hp_after;
        state.pending_damage.push(DamageInstruction { attacker, amount, hp_after });
        if hp_after == 0 {
            state.alive = false;
            drop(state);
            self.bump_token();
            self.death_notify.notify_one();
        }
        Some(hp_after)
    }

    /// Resolves when an external blow kills the mob, so the agent can run its
    /// death handling in the same tick instead of waiting out the sleep.
    pub async fn death_notified(&self) {
        self.death_notify.notified().await;
    }

    /// Records that a player now has this mob on sight.
    pub async fn add_observer(&self, char_id: CharId) {
        self.observers.lock().await.insert(char_id);
    }

    /// Records that a player no longer has this mob on sight.
    pub async fn remove_observer(&self, char_id: CharId) {
        self.observers.lock().await.remove(&char_id);
    }

    /// Takes the whole observer set, leaving it empty. Used by the death path
    /// to purge every watcher exactly once.
    pub async fn take_observers(&self) -> Vec<CharId> {
        self.observers.lock().await.drain().collect()
    }

    /// Display snapshot for appear events.
    pub async fn snapshot(&self) -> serde_json::Value {
        let state = self.state.lock().await;
        serde_json::json!({
            "sight_id": self.sight_id(),
            "template": self.template.id,
            "name": self.template.name,
            "position": state.position,
            "hp": state.hp,
            "max_hp": self.template.max_hp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MapId, MapRect, TemplateId};

    fn test_entity(max_hp: i32) -> Arc<MobEntity> {
        let template = Arc::new(MobTemplate {
            id: TemplateId(1),
            name: "test snail".to_string(),
            max_hp,
            faction: Faction(2),
            level: 3,
            walk_speed: 20.0,
            run_speed: 50.0,
            aggro_range: None,
        });
        let zone = Arc::new(SpawnZone {
            map: MapId(100),
            rect: MapRect::new(0.0, 0.0, 10.0, 10.0),
            count: 1,
            respawn_ms: 1000,
            attackable: true,
            template: TemplateId(1),
        });
        MobEntity::new(ShardId(0), SightId(1), zone, template, Coord::new(5.0, 5.0), false)
    }

    #[tokio::test]
    async fn damage_is_clamped_to_zero() {
        let mob = test_entity(100);
        assert_eq!(mob.apply_damage(CharId::new(), 250).await, Some(0));
        assert_eq!(mob.hp().await, 0);
        assert!(!mob.is_alive().await);
    }

    #[tokio::test]
    async fn negative_damage_never_heals() {
        let mob = test_entity(100);
        mob.apply_damage(CharId::new(), 40).await;
        assert_eq!(mob.apply_damage(CharId::new(), -500).await, Some(60));
        assert_eq!(mob.hp().await, 60);
    }

    #[tokio::test]
    async fn damage_after_death_is_a_noop() {
        let mob = test_entity(10);
        let attacker = CharId::new();
        assert_eq!(mob.apply_damage(attacker, 10).await, Some(0));
        assert_eq!(mob.apply_damage(attacker, 5).await, None);
        assert_eq!(mob.state().await.pending_damage.len(), 1);
    }

    #[tokio::test]
    async fn token_bump_invalidates_older_captures() {
        let mob = test_entity(100);
        let captured = mob.token();
        assert!(mob.token_matches(captured));
        mob.bump_token();
        assert!(!mob.token_matches(captured));
        assert!(mob.token_matches(mob.token()));
    }

    #[tokio::test]
    async fn lethal_damage_wakes_the_agent() {
        let mob = test_entity(10);
        let waiter = mob.clone();
        let handle = tokio::spawn(async move { waiter.death_notified().await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        mob.apply_damage(CharId::new(), 99).await;
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("agent woken on death")
            .expect("task join");
    }

    #[tokio::test]
    async fn take_observers_empties_the_set() {
        let mob = test_entity(100);
        let a = CharId::new();
        let b = CharId::new();
        mob.add_observer(a).await;
        mob.add_observer(b).await;
        mob.remove_observer(b).await;

        let taken = mob.take_observers().await;
        assert_eq!(taken, vec![a]);
        assert!(mob.take_observers().await.is_empty());
    }
}
