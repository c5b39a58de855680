//! # Event Traits and Core Events
//!
//! The event infrastructure of the simulation core: the [`Event`] trait with
//! its blanket JSON implementation, and the built-in simulation events the
//! core publishes on the broadcast bus.
//!
//! Payloads that leave the core (through the bus) travel as already-serialized
//! bytes; the core routes and targets them but never interprets them. The
//! concrete event structs below exist so producers inside the core have typed
//! values to serialize, and so tests can decode what was delivered.

use crate::types::{CharId, Coord, DisplayToken, EntityRef, MapId, ShardId, SightId, TemplateId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::Any;

/// Core trait implemented by every event the simulation publishes.
///
/// A blanket implementation covers any `Serialize + DeserializeOwned` type,
/// so new event types only need the serde derives.
pub trait Event: Send + Sync + Any + std::fmt::Debug {
    /// Stable type name used for logging and routing diagnostics.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event to bytes for bus transport.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from bus bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;

    /// Returns the event as `&dyn Any` for dynamic inspection.
    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| {
            tracing::error!(
                "🔴 Event serialization failed for type '{}': {} (event debug: {:?})",
                Self::type_name(),
                e,
                self
            );
            EventError::Serialization(e)
        })
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(|e| {
            tracing::error!(
                "🔴 Event deserialization failed for type '{}': {} ({} bytes)",
                Self::type_name(),
                e,
                data.len()
            );
            EventError::Deserialization(e)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Errors produced by event serialization and delivery.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Event could not be serialized for transport
    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),

    /// Bus bytes could not be decoded into the expected event type
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),

    /// A session's outbound queue rejected the payload
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// A subscriber handler returned an error
    #[error("Handler execution failed: {0}")]
    HandlerExecution(String),
}

// ============================================================================
// Simulation events
// ============================================================================

/// Published to a single viewer when an entity enters their area of interest.
///
/// Carries the full display snapshot the client needs to render the entity
/// from scratch; subsequent state changes flow through near-cast events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearEvent {
    /// The character whose AoI gained the entity
    pub viewer: CharId,
    /// The entity that appeared
    pub entity: EntityRef,
    /// Display token remembered in the viewer's AoI set
    pub token: DisplayToken,
    /// Full display snapshot, opaque to the distribution layer
    pub snapshot: serde_json::Value,
}

/// Published to a single viewer when an entity leaves their area of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisappearEvent {
    /// The character whose AoI lost the entity
    pub viewer: CharId,
    /// The entity that disappeared
    pub entity: EntityRef,
}

/// Published near a spawn point when a mob enters the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobSpawnEvent {
    pub shard: ShardId,
    pub map: MapId,
    pub sight_id: SightId,
    pub template: TemplateId,
    pub position: Coord,
    pub hp: i32,
    pub max_hp: i32,
}

/// Published near a death position when a mob leaves the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobDespawnEvent {
    pub shard: ShardId,
    pub map: MapId,
    pub sight_id: SightId,
    pub position: Coord,
}

/// Published when damage lands on any combatant.
///
/// The amount is whatever the external combat collaborator computed; the core
/// only applies the clamped HP change and routes the event to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageEvent {
    pub shard: ShardId,
    pub map: MapId,
    /// Who dealt the damage
    pub attacker: EntityRef,
    /// Who received it
    pub target: EntityRef,
    /// Damage amount after combat resolution
    pub amount: i32,
    /// Target HP after the clamped application
    pub hp_after: i32,
}
