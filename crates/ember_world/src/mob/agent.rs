//! # Mob Agent
//!
//! One independently scheduled behavior loop per live mob. The agent owns its
//! entity's state machine:
//!
//! ```text
//! Spawning → Wandering ⇄ Chasing → Attacking → Dead → Respawning → Wandering
//! ```
//!
//! The loop ticks faster while Chasing/Attacking and slower while Wandering,
//! and is woken out of its sleep immediately when an external blow kills the
//! entity so teardown happens in the same tick. Any fault inside one tick is
//! caught and logged here; it never terminates the registry or sibling
//! agents.

use super::combat::CombatResolver;
use super::entity::{MobEntity, MobPhase};
use crate::bus::{BroadcastBus, BroadcastEvent};
use crate::config::SimConfig;
use crate::directory::CharacterDirectory;
use crate::error::WorldError;
use crate::events::{DamageEvent, DisappearEvent, MobDespawnEvent, MobSpawnEvent};
use crate::registry::EntityRegistry;
use crate::session::SessionRegistry;
use crate::shutdown::ShutdownState;
use crate::spatial::SpatialQuery;
use crate::types::{CharId, EntityRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared collaborators handed to every agent on this process.
pub struct AgentDeps {
    pub config: Arc<SimConfig>,
    pub registry: Arc<EntityRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub bus: Arc<BroadcastBus>,
    pub characters: Arc<dyn CharacterDirectory>,
    pub combat: Arc<dyn CombatResolver>,
    pub spatial: Arc<dyn SpatialQuery>,
    pub shutdown: ShutdownState,
}

/// Whether the agent loop keeps running after a tick.
enum AgentFlow {
    Continue,
    Exit,
}

/// The behavior task of one mob.
pub struct MobAgent {
    entity: Arc<MobEntity>,
    deps: Arc<AgentDeps>,
}

impl MobAgent {
    /// Spawns the agent task for an entity. The task runs until the entity is
    /// permanently removed (once-mob death or zone teardown).
    pub fn spawn(entity: Arc<MobEntity>, deps: Arc<AgentDeps>) -> JoinHandle<()> {
        let agent = Self { entity, deps };
        tokio::spawn(async move { agent.run().await })
    }

    async fn run(self) {
        debug!(
            "🐾 Agent started for {} ({} on {})",
            self.entity.id, self.entity.template.name, self.entity.shard
        );
        loop {
            let interval = self.tick_interval().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                // A lethal external blow wakes the agent so teardown happens
                // in the same tick as the death.
                _ = self.entity.death_notified() => {}
            }

            // World teardown retires the agent permanently.
            if self.deps.shutdown.is_shutdown_initiated() {
                break;
            }

            match self.tick().await {
                Ok(AgentFlow::Continue) => {}
                Ok(AgentFlow::Exit) => break,
                Err(e) => {
                    // Contained: the fault stays inside this agent.
                    warn!("🟡 Agent tick fault for {}: {}", self.entity.id, e);
                }
            }
        }
        debug!("🐾 Agent exited for {}", self.entity.id);
    }

    async fn tick_interval(&self) -> Duration {
        let state = self.entity.state().await;
        match state.phase {
            MobPhase::Chasing | MobPhase::Attacking | MobPhase::Dead => {
                self.deps.config.combat_tick()
            }
            MobPhase::Respawning => self.entity.zone.respawn(),
            MobPhase::Spawning | MobPhase::Wandering => self.deps.config.wander_tick(),
        }
    }

    async fn tick(&self) -> Result<AgentFlow, WorldError> {
        self.flush_pending_damage().await;

        let (alive, phase) = {
            let state = self.entity.state().await;
            (state.alive, state.phase)
        };

        if !alive && !matches!(phase, MobPhase::Respawning) {
            return self.die().await;
        }

        match phase {
            MobPhase::Spawning => self.enter_world().await,
            MobPhase::Wandering => self.wander_tick().await,
            MobPhase::Chasing => self.chase_tick().await,
            MobPhase::Attacking => self.attack_tick().await,
            MobPhase::Respawning => self.respawn().await,
            // Dead is transitional; die() has already moved the phase on.
            MobPhase::Dead => Ok(AgentFlow::Continue),
        }
    }

    /// Publishes damage events for externally-applied rows. The external path
    /// only mutates HP under the entity lock; publication always happens from
    /// the owning task so a producer's events stay in emission order.
    async fn flush_pending_damage(&self) {
        let rows = {
            let mut state = self.entity.state().await;
            std::mem::take(&mut state.pending_damage)
        };
        if rows.is_empty() {
            return;
        }
        let sight_id = self.entity.sight_id();
        let map = self.entity.zone.map;
        for row in rows {
            let event = DamageEvent {
                shard: self.entity.shard,
                map,
                attacker: EntityRef::Player(row.attacker),
                target: EntityRef::Mob(sight_id),
                amount: row.amount,
                hp_after: row.hp_after,
            };
            match BroadcastEvent::near_entity(self.entity.shard, map, EntityRef::Mob(sight_id), &event)
            {
                Ok(broadcast) => {
                    if let Err(e) = self.deps.bus.publish(broadcast) {
                        warn!("🟡 Damage event publish failed for {}: {}", self.entity.id, e);
                    }
                }
                Err(e) => warn!("🟡 Damage event encode failed for {}: {}", self.entity.id, e),
            }
        }
    }

    /// Spawning: announce the entity and start wandering.
    async fn enter_world(&self) -> Result<AgentFlow, WorldError> {
        let (position, hp) = {
            let mut state = self.entity.state().await;
            state.phase = MobPhase::Wandering;
            (state.position, state.hp)
        };
        let event = MobSpawnEvent {
            shard: self.entity.shard,
            map: self.entity.zone.map,
            sight_id: self.entity.sight_id(),
            template: self.entity.template.id,
            position,
            hp,
            max_hp: self.entity.template.max_hp,
        };
        let broadcast = BroadcastEvent::near_point(
            self.entity.shard,
            self.entity.zone.map,
            position,
            self.deps.config.visibility_radius,
            &event,
        )
        .map_err(|e| WorldError::Bus(e.to_string()))?;
        self.deps.bus.publish(broadcast)?;
        Ok(AgentFlow::Continue)
    }

    /// Wandering: stroll between random points, scan for hostile players.
    async fn wander_tick(&self) -> Result<AgentFlow, WorldError> {
        let next_point = {
            let mut rng = rand::thread_rng();
            self.entity.zone.rect.random_point(&mut rng)
        };
        let step = self.entity.template.walk_speed * self.deps.config.wander_tick().as_secs_f64();
        let position = {
            let mut state = self.entity.state().await;
            if state.position.distance(state.target_position) < 1e-6 {
                state.target_position = next_point;
            }
            state.position = state.position.step_toward(state.target_position, step);
            state.position
        };

        if !self.entity.zone.attackable {
            return Ok(AgentFlow::Continue);
        }

        let aggro_range = self
            .entity
            .template
            .aggro_range
            .unwrap_or(self.deps.config.aggro_range);
        let nearby = self
            .deps
            .spatial
            .players_near(self.entity.shard, self.entity.zone.map, position, aggro_range)
            .await;

        for player in nearby {
            let hostile = match self.deps.characters.faction(player.char_id).await {
                Some(faction) => self.entity.faction().is_hostile_to(faction),
                None => false,
            };
            if hostile && self.deps.characters.is_alive(player.char_id).await {
                let mut state = self.entity.state().await;
                state.target = Some(player.char_id);
                state.target_position = player.position;
                state.phase = MobPhase::Chasing;
                drop(state);
                self.entity.bump_token();
                debug!(
                    "🎯 {} aggroed onto {} on {}",
                    self.entity.sight_id(),
                    player.char_id,
                    self.entity.shard
                );
                break;
            }
        }
        Ok(AgentFlow::Continue)
    }

    /// Chasing: run toward the target's last known coordinate, with the leash
    /// policy bounding how far the mob may stray from its spawn rect.
    async fn chase_tick(&self) -> Result<AgentFlow, WorldError> {
        // Copy the target out before any further locking.
        let target = self.entity.state().await.target;
        let target = match target {
            Some(target) => target,
            None => return self.return_to_wander().await,
        };

        let target_position = match self.deps.characters.position(target).await {
            Some(position) if self.deps.characters.is_alive(target).await => position,
            // Disconnected or dead: lose the target.
            _ => return self.return_to_wander().await,
        };

        let step = self.entity.template.run_speed * self.deps.config.combat_tick().as_secs_f64();
        let leash = self.deps.config.leash_distance;
        let attack_range = self.deps.config.attack_range;
        let rect = self.entity.zone.rect;

        let mut state = self.entity.state().await;
        if rect.distance_to(state.position) > leash {
            // Leashed: snap back inside the spawn rect and give up the chase.
            state.position = rect.clamp(state.position);
            state.target_position = state.position;
            state.target = None;
            state.phase = MobPhase::Wandering;
            drop(state);
            self.entity.bump_token();
            debug!("🪢 {} leashed back to its zone", self.entity.sight_id());
            return Ok(AgentFlow::Continue);
        }

        state.target_position = target_position;
        if state.position.distance(target_position) <= attack_range {
            state.phase = MobPhase::Attacking;
            drop(state);
            self.entity.bump_token();
            return Ok(AgentFlow::Continue);
        }
        state.position = state.position.step_toward(target_position, step);
        Ok(AgentFlow::Continue)
    }

    /// Attacking: resolve one blow per tick and schedule its delayed commit.
    async fn attack_tick(&self) -> Result<AgentFlow, WorldError> {
        let target = self.entity.state().await.target;
        let target = match target {
            Some(target) => target,
            None => return self.return_to_wander().await,
        };

        let target_position = match self.deps.characters.position(target).await {
            Some(position) if self.deps.characters.is_alive(target).await => position,
            _ => return self.return_to_wander().await,
        };

        let position = self.entity.position().await;
        if position.distance(target_position) > self.deps.config.attack_range * 1.5 {
            // Target stepped out; resume the chase.
            let mut state = self.entity.state().await;
            state.phase = MobPhase::Chasing;
            drop(state);
            self.entity.bump_token();
            return Ok(AgentFlow::Continue);
        }

        if let Some(outcome) = self.deps.combat.mob_attack(&self.entity, target).await {
            // The attack is a new action: regenerate the token and hand it to
            // the delayed commit. Anything that supersedes this attack bumps
            // the token again and the commit becomes a no-op.
            let token = self.entity.bump_token();
            self.schedule_damage_commit(target, outcome.amount, token);
        }
        Ok(AgentFlow::Continue)
    }

    /// Schedules the damage commit of one attack after the cast delay.
    ///
    /// The commit applies only when its captured token is still current;
    /// token staleness is the entire cancellation mechanism.
    fn schedule_damage_commit(&self, target: CharId, amount: i32, token: u64) {
        let entity = self.entity.clone();
        let deps = self.deps.clone();
        let delay = self.deps.config.attack_commit();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !entity.token_matches(token) {
                debug!("⏳ Stale commit dropped for {} (superseded action)", entity.id);
                return;
            }
            if !entity.is_alive().await {
                return;
            }
            let hp_after = match deps.characters.apply_damage(target, amount).await {
                Some(hp_after) => hp_after,
                // Target vanished between cast and commit: silent no-op.
                None => return,
            };
            let event = DamageEvent {
                shard: entity.shard,
                map: entity.zone.map,
                attacker: EntityRef::Mob(entity.sight_id()),
                target: EntityRef::Player(target),
                amount,
                hp_after,
            };
            match BroadcastEvent::near_entity(
                entity.shard,
                entity.zone.map,
                EntityRef::Mob(entity.sight_id()),
                &event,
            ) {
                Ok(broadcast) => {
                    if let Err(e) = deps.bus.publish(broadcast) {
                        warn!("🟡 Attack commit publish failed for {}: {}", entity.id, e);
                    }
                }
                Err(e) => warn!("🟡 Attack commit encode failed for {}: {}", entity.id, e),
            }
        });
    }

    async fn return_to_wander(&self) -> Result<AgentFlow, WorldError> {
        let mut state = self.entity.state().await;
        state.target = None;
        state.target_position = state.position;
        state.phase = MobPhase::Wandering;
        drop(state);
        self.entity.bump_token();
        Ok(AgentFlow::Continue)
    }

    /// Death teardown, all in one tick: leave the index, purge every
    /// observer's AoI set (exactly one disappear each), announce the despawn,
    /// then lazily recycle the sight id.
    async fn die(&self) -> Result<AgentFlow, WorldError> {
        let sight_id = self.entity.sight_id();
        let shard = self.entity.shard;
        let map = self.entity.zone.map;

        let position = {
            let mut state = self.entity.state().await;
            state.phase = MobPhase::Dead;
            state.target = None;
            state.position
        };
        // Any in-flight delayed commit loses the token race here.
        self.entity.bump_token();

        // Out of the index first so no new observer can pick the mob up.
        self.deps.registry.detach(shard, map, sight_id);

        // Purge prior observers. The AoI removal is the dedup point, so each
        // observer gets exactly one disappear event even if its tracker races
        // this teardown.
        for observer in self.entity.take_observers().await {
            if let Some(session) = self.deps.sessions.by_char(observer) {
                if session.interest.mobs.remove(sight_id).await {
                    let event = DisappearEvent { viewer: observer, entity: EntityRef::Mob(sight_id) };
                    match BroadcastEvent::to_character(observer, &event) {
                        Ok(broadcast) => {
                            if let Err(e) = self.deps.bus.publish(broadcast) {
                                warn!("🟡 Disappear publish failed for {}: {}", observer, e);
                            }
                        }
                        Err(e) => warn!("🟡 Disappear encode failed for {}: {}", observer, e),
                    }
                }
            }
        }

        // Teardown must run to completion exactly once, so a bus failure here
        // is logged rather than propagated.
        let despawn = MobDespawnEvent { shard, map, sight_id, position };
        match BroadcastEvent::near_point(shard, map, position, self.deps.config.visibility_radius, &despawn)
        {
            Ok(broadcast) => {
                if let Err(e) = self.deps.bus.publish(broadcast) {
                    warn!("🟡 Despawn publish failed for {}: {}", self.entity.id, e);
                }
            }
            Err(e) => warn!("🟡 Despawn encode failed for {}: {}", self.entity.id, e),
        }

        // Sight id goes back to the pool only now, after every observer has
        // been purged.
        self.deps.registry.recycle(shard, map, sight_id).await;

        if self.entity.once {
            info!("💀 Once-mob {} discarded permanently", self.entity.id);
            return Ok(AgentFlow::Exit);
        }

        self.entity.state().await.phase = MobPhase::Respawning;
        debug!(
            "💀 {} dead on {}; respawning in {:?}",
            self.entity.id,
            shard,
            self.entity.zone.respawn()
        );
        Ok(AgentFlow::Continue)
    }

    /// Respawning: after the zone's timer, re-enter the world as a fresh
    /// entity at full HP on a new random point.
    async fn respawn(&self) -> Result<AgentFlow, WorldError> {
        let sight_id = self.deps.registry.reinsert(&self.entity).await?;
        self.entity.bump_token();
        debug!("🌱 {} respawned as {} on {}", self.entity.id, sight_id, self.entity.shard);
        // Next tick runs the Spawning phase and announces the entity.
        Ok(AgentFlow::Continue)
    }
}

/// Convenience: spawns agents for a batch of freshly-registered entities.
pub fn spawn_agents(entities: &[Arc<MobEntity>], deps: &Arc<AgentDeps>) -> Vec<JoinHandle<()>> {
    entities
        .iter()
        .map(|entity| MobAgent::spawn(entity.clone(), deps.clone()))
        .collect()
}
