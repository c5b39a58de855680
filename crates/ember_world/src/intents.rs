//! # Intent Dispatch
//!
//! Pre-decoded action intents from the protocol layer arrive as (opcode,
//! payload) pairs. Instead of a switch over numeric codes, handlers register
//! themselves in a table keyed by opcode; dispatch looks the handler up and
//! invokes its single method. Unknown opcodes are logged and dropped;
//! transient lookup misses inside a handler (target already dead or removed)
//! are silent no-ops.

use crate::error::WorldError;
use crate::mob::AgentDeps;
use crate::session::SessionRegistry;
use crate::types::{CharId, Coord, MapId, ShardId, SightId};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Opcode for attack intents.
pub const OP_ATTACK_MOB: u16 = 0x21;
/// Opcode for movement intents.
pub const OP_MOVE: u16 = 0x14;

/// A single-method capability handling one opcode.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    /// Handler name for logging.
    fn name(&self) -> &str;

    /// Processes one decoded intent from `sender`.
    async fn handle(&self, sender: CharId, payload: serde_json::Value) -> Result<(), WorldError>;
}

/// Registration table from opcode to handler.
#[derive(Default)]
pub struct IntentRegistry {
    handlers: DashMap<u16, Arc<dyn IntentHandler>>,
}

impl IntentRegistry {
    /// Creates an empty table.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { handlers: DashMap::new() })
    }

    /// Registers a handler for an opcode, replacing any previous one.
    pub fn register(&self, opcode: u16, handler: Arc<dyn IntentHandler>) {
        if let Some(previous) = self.handlers.insert(opcode, handler) {
            warn!("🟡 Intent handler for opcode {:#06x} replaced {}", opcode, previous.name());
        }
    }

    /// Dispatches one intent. A missing handler or a handler error is logged
    /// here and never propagated to the connection read loop.
    pub async fn dispatch(&self, opcode: u16, sender: CharId, payload: serde_json::Value) {
        let handler = match self.handlers.get(&opcode) {
            Some(handler) => handler.clone(),
            None => {
                debug!("📭 No handler for opcode {:#06x}, dropping intent", opcode);
                return;
            }
        };
        if let Err(e) = handler.handle(sender, payload).await {
            warn!("🟡 Intent handler '{}' failed: {}", handler.name(), e);
        }
    }

    /// Number of registered opcodes.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// ============================================================================
// Standard intents
// ============================================================================

/// Decoded attack intent: damage already computed by the external combat
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackMobIntent {
    pub shard: ShardId,
    pub map: MapId,
    pub sight_id: SightId,
    pub damage: i32,
}

/// Applies player damage to a mob.
pub struct AttackMobHandler {
    deps: Arc<AgentDeps>,
}

impl AttackMobHandler {
    /// Creates the handler over the shared agent collaborators.
    pub fn new(deps: Arc<AgentDeps>) -> Arc<Self> {
        Arc::new(Self { deps })
    }
}

#[async_trait]
impl IntentHandler for AttackMobHandler {
    fn name(&self) -> &str {
        "attack_mob"
    }

    async fn handle(&self, sender: CharId, payload: serde_json::Value) -> Result<(), WorldError> {
        let intent: AttackMobIntent =
            serde_json::from_value(payload).map_err(|e| WorldError::Intent(e.to_string()))?;

        let mob = match self.deps.registry.lookup(intent.shard, intent.map, intent.sight_id) {
            Some(mob) => mob,
            // Already dead or removed: silent no-op, not an error.
            None => return Ok(()),
        };
        if !mob.zone.attackable {
            debug!("🛡 {} attacked unattackable mob {}", sender, intent.sight_id);
            return Ok(());
        }
        // None here means the mob died under a concurrent blow; equally a
        // no-op. The agent publishes the damage event from its own task.
        let _ = mob.apply_damage(sender, intent.damage).await;
        Ok(())
    }
}

/// Decoded movement intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveIntent {
    pub position: Coord,
}

/// Updates the sender's live position.
pub struct MoveHandler {
    sessions: Arc<SessionRegistry>,
}

impl MoveHandler {
    /// Creates the handler over the session registry.
    pub fn new(sessions: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self { sessions })
    }
}

#[async_trait]
impl IntentHandler for MoveHandler {
    fn name(&self) -> &str {
        "move"
    }

    async fn handle(&self, sender: CharId, payload: serde_json::Value) -> Result<(), WorldError> {
        let intent: MoveIntent =
            serde_json::from_value(payload).map_err(|e| WorldError::Intent(e.to_string()))?;
        if let Some(session) = self.sessions.by_char(sender) {
            session.set_position(intent.position).await;
        }
        Ok(())
    }
}
