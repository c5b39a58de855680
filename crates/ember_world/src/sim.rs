//! # World Simulation
//!
//! The assembly point of the core: owns the registries, the bus, the seams,
//! and the task handles, and exposes the operations the server shell calls:
//! world load, session open/close, intent dispatch, admin spawn, teardown.

use crate::bus::{BroadcastBus, SessionFanout};
use crate::config::SimConfig;
use crate::directory::{CharProfile, SessionDirectory};
use crate::drops::DropRegistry;
use crate::error::WorldError;
use crate::intents::{
    AttackMobHandler, IntentRegistry, MoveHandler, OP_ATTACK_MOB, OP_MOVE,
};
use crate::interest::{InterestTracker, TrackerDeps};
use crate::mob::{
    spawn_agents, AgentDeps, CombatResolver, LevelScaledCombat, MobAgent, SpawnZone,
};
use crate::npcs::NpcTable;
use crate::registry::EntityRegistry;
use crate::session::{Session, SessionRegistry, SessionId};
use crate::shutdown::ShutdownState;
use crate::spatial::LocalWorldView;
use crate::store::WorldStore;
use crate::types::{CharId, Coord, MapId, ShardId};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Outcome of a world load.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorldLoadReport {
    /// Zones registered successfully
    pub zones_loaded: usize,
    /// Zones rejected and skipped
    pub zones_skipped: usize,
    /// Mob agents started
    pub mobs_spawned: usize,
}

/// The running simulation of one process, across all of its shards.
pub struct WorldSim {
    config: Arc<SimConfig>,
    shards: Vec<ShardId>,
    registry: Arc<EntityRegistry>,
    sessions: Arc<SessionRegistry>,
    bus: Arc<BroadcastBus>,
    drops: Arc<DropRegistry>,
    npcs: Arc<NpcTable>,
    directory: Arc<SessionDirectory>,
    intents: Arc<IntentRegistry>,
    agent_deps: Arc<AgentDeps>,
    tracker_deps: Arc<TrackerDeps>,
    agent_handles: Mutex<Vec<JoinHandle<()>>>,
    tracker_handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: ShutdownState,
}

impl WorldSim {
    /// Builds the simulation for `shard_count` parallel shards, wires the
    /// standard bus fan-out and intent handlers, and leaves it empty until
    /// [`Self::load_world`].
    pub async fn new(config: SimConfig, shard_count: u16) -> Arc<Self> {
        Self::with_combat(config, shard_count, Arc::new(LevelScaledCombat::default())).await
    }

    /// Same as [`Self::new`] with a caller-supplied combat collaborator.
    pub async fn with_combat(
        config: SimConfig,
        shard_count: u16,
        combat: Arc<dyn CombatResolver>,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let shards: Vec<ShardId> = (0..shard_count).map(ShardId).collect();

        let registry = EntityRegistry::new(config.clone());
        let sessions = Arc::new(SessionRegistry::new());
        let bus = BroadcastBus::new();
        let drops = DropRegistry::new(config.drop_claim_ttl());
        let npcs = NpcTable::new();
        let directory = SessionDirectory::new(sessions.clone());
        let shutdown = ShutdownState::new();

        let spatial = LocalWorldView::new(
            registry.clone(),
            sessions.clone(),
            npcs.clone(),
            drops.clone(),
            directory.clone(),
        );

        // Receiver-side targeting: the one per-process fan-out subscriber.
        bus.subscribe(SessionFanout::new(sessions.clone())).await;

        let agent_deps = Arc::new(AgentDeps {
            config: config.clone(),
            registry: registry.clone(),
            sessions: sessions.clone(),
            bus: bus.clone(),
            characters: directory.clone(),
            combat,
            spatial: spatial.clone(),
            shutdown: shutdown.clone(),
        });
        let tracker_deps = Arc::new(TrackerDeps {
            config: config.clone(),
            registry: registry.clone(),
            spatial,
            characters: directory.clone(),
            bus: bus.clone(),
        });

        let intents = IntentRegistry::new();
        intents.register(OP_ATTACK_MOB, AttackMobHandler::new(agent_deps.clone()));
        intents.register(OP_MOVE, MoveHandler::new(sessions.clone()));

        Arc::new(Self {
            config,
            shards,
            registry,
            sessions,
            bus,
            drops,
            npcs,
            directory,
            intents,
            agent_deps,
            tracker_deps,
            agent_handles: Mutex::new(Vec::new()),
            tracker_handles: Mutex::new(Vec::new()),
            shutdown,
        })
    }

    /// Loads the world from the store: NPC placements, then every spawn zone
    /// on every shard. A zone that fails validation is logged and skipped;
    /// world load always completes.
    pub async fn load_world(&self, store: &dyn WorldStore) -> Result<WorldLoadReport, WorldError> {
        let mut report = WorldLoadReport::default();

        self.npcs.reload(store.npc_seeds().await?);

        let zones = store.spawn_zones().await?;
        for shard in &self.shards {
            for zone in &zones {
                match self.registry.register(*shard, zone.clone(), store).await {
                    Ok(entities) => {
                        report.zones_loaded += 1;
                        report.mobs_spawned += entities.len();
                        let handles = spawn_agents(&entities, &self.agent_deps);
                        self.agent_handles.lock().await.extend(handles);
                    }
                    Err(e) => {
                        report.zones_skipped += 1;
                        error!("❌ Skipping zone on {} {}: {}", shard, zone.map, e);
                    }
                }
            }
        }

        info!(
            "🌍 World loaded: {} zone registrations, {} skipped, {} mobs across {} shards",
            report.zones_loaded,
            report.zones_skipped,
            report.mobs_spawned,
            self.shards.len()
        );
        Ok(report)
    }

    /// Admin refresh: re-reads NPC placements from the store. Spawn zones and
    /// templates of already-live mobs are not disturbed.
    pub async fn refresh_npcs(&self, store: &dyn WorldStore) -> Result<usize, WorldError> {
        let seeds = store.npc_seeds().await?;
        let count = seeds.len();
        self.npcs.reload(seeds);
        info!("🔄 NPC table refreshed ({count} placements)");
        Ok(count)
    }

    /// Spawns one mob outside the persistent zones (admin command or dungeon
    /// script) and starts its agent. `once` mobs never respawn.
    pub async fn admin_spawn(
        &self,
        shard: ShardId,
        zone: Arc<SpawnZone>,
        store: &dyn WorldStore,
        once: bool,
    ) -> Result<(), WorldError> {
        if self.shutdown.is_shutdown_initiated() {
            return Err(WorldError::Config("world is shutting down".to_string()));
        }
        let entity = self.registry.spawn_single(shard, zone, store, once).await?;
        let handle = MobAgent::spawn(entity, self.agent_deps.clone());
        self.agent_handles.lock().await.push(handle);
        Ok(())
    }

    /// Opens a session at character selection: registers the combat profile,
    /// creates the session, and starts its interest tracker. Returns the
    /// session and the outbound receiver for the connection's write loop.
    pub async fn open_session(
        &self,
        char_id: CharId,
        shard: ShardId,
        map: MapId,
        position: Coord,
        profile: CharProfile,
    ) -> Result<(Arc<Session>, mpsc::UnboundedReceiver<Vec<u8>>), WorldError> {
        if self.shutdown.is_shutdown_initiated() {
            return Err(WorldError::Config("world is shutting down".to_string()));
        }
        self.directory.insert_profile(char_id, profile);
        let (session, rx) = self.sessions.open(char_id, shard, map, position);
        let handle = InterestTracker::spawn(session.clone(), self.tracker_deps.clone());
        self.tracker_handles.lock().await.push(handle);
        Ok((session, rx))
    }

    /// Closes a session at logout. The tracker observes the cleared liveness
    /// flag at the top of its next cycle and exits.
    pub fn close_session(&self, session_id: SessionId) {
        if let Some(session) = self.sessions.get(session_id) {
            self.directory.remove_profile(session.char_id);
        }
        self.sessions.close(session_id);
    }

    /// Routes one decoded intent through the registration table.
    pub async fn dispatch_intent(&self, opcode: u16, sender: CharId, payload: serde_json::Value) {
        self.intents.dispatch(opcode, sender, payload).await;
    }

    /// Graceful teardown: stop accepting work, close every session, and let
    /// the agents observe the shutdown flag.
    pub async fn teardown(&self) {
        self.shutdown.initiate_shutdown();
        for session in self.sessions.all() {
            self.close_session(session.id);
        }
        // Agents observe the flag at their next tick and retire themselves.
        let agents = self.agent_handles.lock().await.len();
        let trackers = self.tracker_handles.lock().await.len();
        info!("🛑 Teardown: {} agent tasks and {} tracker tasks retiring", agents, trackers);
        self.shutdown.complete_shutdown();
    }

    /// Simulation configuration.
    pub fn config(&self) -> Arc<SimConfig> {
        self.config.clone()
    }

    /// The shards this process simulates.
    pub fn shards(&self) -> &[ShardId] {
        &self.shards
    }

    /// The entity registry.
    pub fn registry(&self) -> Arc<EntityRegistry> {
        self.registry.clone()
    }

    /// The session registry.
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }

    /// The broadcast bus.
    pub fn bus(&self) -> Arc<BroadcastBus> {
        self.bus.clone()
    }

    /// The drop registry.
    pub fn drops(&self) -> Arc<DropRegistry> {
        self.drops.clone()
    }

    /// The character directory.
    pub fn directory(&self) -> Arc<SessionDirectory> {
        self.directory.clone()
    }

    /// The shared shutdown state.
    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown.clone()
    }
}

impl std::fmt::Debug for WorldSim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldSim")
            .field("shards", &self.shards.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
