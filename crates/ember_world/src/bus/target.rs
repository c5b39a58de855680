//! Broadcast events and their delivery predicates.

use crate::events::{Event, EventError};
use crate::types::{CharId, Coord, EntityRef, MapId, ShardId};
use serde::{Deserialize, Serialize};

/// Receiver-evaluated delivery predicate of a broadcast event.
///
/// The predicate travels with the event and is evaluated by each receiving
/// process against its OWN local sessions; the publisher never resolves
/// recipients. A process with no matching local session silently drops the
/// event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Target {
    /// Deliver to every local session.
    Global,
    /// Deliver to the local session of one character, if present.
    Character(CharId),
    /// Near-cast: deliver to sessions on (shard, map) whose AoI currently
    /// contains the referenced entity.
    NearEntity {
        shard: ShardId,
        map: MapId,
        entity: EntityRef,
    },
    /// Near-cast: deliver to sessions on (shard, map) within `radius` of
    /// `center`.
    NearPoint {
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
    },
}

/// A fire-and-forget event on the broadcast bus.
///
/// The payload is opaque, already-serialized bytes: the bus routes and
/// targets, it never interprets.
#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    /// Opaque serialized payload
    pub payload: Vec<u8>,
    /// Delivery predicate, evaluated on the receiving side
    pub target: Target,
}

impl BroadcastEvent {
    /// Builds a globally-delivered event from a typed payload.
    pub fn global<T: Event>(event: &T) -> Result<Self, EventError> {
        Ok(Self { payload: event.serialize()?, target: Target::Global })
    }

    /// Builds an event addressed to a single character's session.
    pub fn to_character<T: Event>(char_id: CharId, event: &T) -> Result<Self, EventError> {
        Ok(Self { payload: event.serialize()?, target: Target::Character(char_id) })
    }

    /// Builds a near-cast event keyed on AoI membership of `entity`.
    pub fn near_entity<T: Event>(
        shard: ShardId,
        map: MapId,
        entity: EntityRef,
        event: &T,
    ) -> Result<Self, EventError> {
        Ok(Self {
            payload: event.serialize()?,
            target: Target::NearEntity { shard, map, entity },
        })
    }

    /// Builds a near-cast event keyed on distance from a point.
    pub fn near_point<T: Event>(
        shard: ShardId,
        map: MapId,
        center: Coord,
        radius: f64,
        event: &T,
    ) -> Result<Self, EventError> {
        Ok(Self {
            payload: event.serialize()?,
            target: Target::NearPoint { shard, map, center, radius },
        })
    }
}
