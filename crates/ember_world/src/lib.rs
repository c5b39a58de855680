//! # Emberfall World Core
//!
//! The real-time simulation layer of the Emberfall world server. It keeps
//! every autonomous creature moving, fighting, and respawning, keeps every
//! connected player aware of exactly the entities near them, and distributes
//! state changes to exactly the observers who need them, across several
//! parallel world shards.
//!
//! ## Components
//!
//! - **Entity Registry** ([`registry`]): live mob records per (shard, map)
//!   and the bounded sight-id pools addressing them
//! - **Mob Agent** ([`mob`]): one independently scheduled behavior task per
//!   live mob: `Spawning → Wandering ⇄ Chasing → Attacking → Dead →
//!   Respawning`
//! - **Interest Tracker** ([`interest`]): per-session area-of-interest scan
//!   across five entity categories, emitting appear/disappear deltas
//! - **Broadcast Bus** ([`bus`]): publish/subscribe distribution with
//!   receiver-side targeting (global, per-character, near-entity, near-point)
//! - **Session Registry** ([`session`]): local delivery endpoints the bus
//!   fans out through
//!
//! ## Concurrency Model
//!
//! Many independently scheduled long-lived tokio tasks: one per live mob,
//! one per active session's tracker, plus the bus dispatch task. There is no
//! global lock anywhere: the shard/map index, each entity's state, and each
//! AoI category carry their own lock so tick latency stays bounded under
//! high entity counts. Delayed effects (skill commits) are invalidated by
//! token comparison instead of timer cancellation.
//!
//! ## Collaborator Seams
//!
//! Wire-protocol codecs, combat formulas, character state, and persistent
//! storage live outside this crate, behind the [`store::WorldStore`],
//! [`mob::CombatResolver`], [`directory::CharacterDirectory`], and
//! [`spatial::SpatialQuery`] traits.
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use ember_world::{SimConfig, WorldSim};
//! use ember_world::store::StaticWorldStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sim = WorldSim::new(SimConfig::default(), 2).await;
//!     let store = StaticWorldStore::default();
//!     let report = sim.load_world(&store).await?;
//!     println!("{} mobs live", report.mobs_spawned);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod bus;
pub mod config;
pub mod directory;
pub mod drops;
pub mod error;
pub mod events;
pub mod intents;
pub mod interest;
pub mod mob;
pub mod npcs;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod sim;
pub mod spatial;
pub mod store;
pub mod types;

// Scenario-level integration tests
mod tests;

// Re-export commonly used items for convenience
pub use bus::{BroadcastBus, BroadcastEvent, BusSubscriber, SessionFanout, Target};
pub use config::SimConfig;
pub use directory::{CharProfile, CharacterDirectory, PetInfo, SessionDirectory};
pub use error::WorldError;
pub use events::{
    AppearEvent, DamageEvent, DisappearEvent, Event, EventError, MobDespawnEvent, MobSpawnEvent,
};
pub use interest::{InterestTracker, PlayerInterestState, TrackerDeps};
pub use mob::{
    AgentDeps, CombatResolver, DamageOutcome, LevelScaledCombat, MobAgent, MobEntity, MobPhase,
    MobTemplate, SpawnZone,
};
pub use registry::EntityRegistry;
pub use session::{Session, SessionRegistry};
pub use shutdown::ShutdownState;
pub use sim::{WorldLoadReport, WorldSim};
pub use store::{StaticWorldStore, WorldStore};
pub use types::*;
