//! # Core Type Definitions
//!
//! Fundamental types used throughout the Emberfall simulation core: id
//! newtypes for every entity kind, 2D world coordinates, and spawn-zone
//! rectangles.
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent id confusion (a `SightId` can
//!   never be passed where a `CharId` is expected)
//! - **Serialization**: All types serialize to JSON for event payloads
//! - **Scoping**: A `SightId` is only meaningful within one (shard, map);
//!   the permanent `MobId` is the storage identity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of several parallel world instances. Shards share map layouts but are
/// simulated independently; nothing crosses a shard boundary at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardId(pub u16);

impl std::fmt::Display for ShardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shard-{}", self.0)
    }
}

/// Identifier for a map layout within a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapId(pub u32);

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "map-{}", self.0)
    }
}

/// Short-lived id used to address a live entity in player-facing messages.
///
/// Sight ids are scoped to one (shard, map), drawn from a bounded per-shard
/// pool, and recycled lazily after the holding entity dies. They are never
/// valid across maps and never unique across time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SightId(pub u32);

impl std::fmt::Display for SightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permanent storage identity of a mob record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MobId(pub Uuid);

impl MobId {
    /// Creates a new random mob id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an active character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharId(pub Uuid);

impl CharId {
    /// Creates a new random character id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CharId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a static NPC placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcId(pub u32);

impl std::fmt::Display for NpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "npc-{}", self.0)
    }
}

/// Identifier for a dropped item on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropId(pub u64);

impl std::fmt::Display for DropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drop-{}", self.0)
    }
}

/// Identifier for a pet instance derived from its owner's equipped-pet slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PetId(pub Uuid);

impl PetId {
    /// Creates a new random pet id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a mob template loaded from the world store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "template-{}", self.0)
    }
}

/// Faction alignment. Two parties are hostile iff their factions differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Faction(pub u16);

impl Faction {
    /// Returns true when `other` is a valid attack target for this faction.
    pub fn is_hostile_to(&self, other: Faction) -> bool {
        self.0 != other.0
    }
}

/// A 2D position in map coordinates.
///
/// Maps are flat planes; double precision keeps long-running movement
/// integration stable on large maps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (east-west axis)
    pub x: f64,
    /// Y coordinate (north-south axis)
    pub y: f64,
}

impl Coord {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(&self, other: Coord) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Moves up to `step` units toward `target`, stopping exactly on it when
    /// the remaining distance is shorter than the step.
    pub fn step_toward(&self, target: Coord, step: f64) -> Coord {
        let dist = self.distance(target);
        if dist <= step || dist == 0.0 {
            return target;
        }
        let t = step / dist;
        Coord::new(self.x + (target.x - self.x) * t, self.y + (target.y - self.y) * t)
    }
}

impl Default for Coord {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Axis-aligned bounding rectangle of a spawn zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRect {
    /// Minimum X coordinate (western boundary)
    pub min_x: f64,
    /// Minimum Y coordinate (southern boundary)
    pub min_y: f64,
    /// Maximum X coordinate (eastern boundary)
    pub max_x: f64,
    /// Maximum Y coordinate (northern boundary)
    pub max_y: f64,
}

impl MapRect {
    /// Creates a new rectangle from its corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Returns true when the rectangle has positive area.
    pub fn is_valid(&self) -> bool {
        self.min_x < self.max_x && self.min_y < self.max_y
    }

    /// Returns true when `point` lies inside the rectangle (inclusive).
    pub fn contains(&self, point: Coord) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    /// Clamps `point` to the nearest coordinate inside the rectangle.
    pub fn clamp(&self, point: Coord) -> Coord {
        Coord::new(
            point.x.clamp(self.min_x, self.max_x),
            point.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Center of the rectangle.
    pub fn center(&self) -> Coord {
        Coord::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Shortest distance from `point` to the rectangle; zero when inside.
    pub fn distance_to(&self, point: Coord) -> f64 {
        point.distance(self.clamp(point))
    }

    /// Picks a uniformly random point inside the rectangle.
    pub fn random_point<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Coord {
        Coord::new(
            rng.gen_range(self.min_x..=self.max_x),
            rng.gen_range(self.min_y..=self.max_y),
        )
    }
}

/// Reference to any entity a player session can have on sight.
///
/// Used both as the key of near-cast targeting ("recipient whose AoI contains
/// entity X") and inside appear/disappear payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// Another character, by character id
    Player(CharId),
    /// A live mob, by its (shard, map)-scoped sight id
    Mob(SightId),
    /// A static NPC placement
    Npc(NpcId),
    /// A dropped item
    Drop(DropId),
    /// A pet derived from some character's equipped-pet slot
    Pet(PetId),
}

/// Opaque handle remembered per on-sight entity so a tracker knows what
/// display state it last told the client about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayToken(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_distance_and_step() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-9);

        // A long step lands exactly on the target, never past it.
        assert_eq!(a.step_toward(b, 10.0), b);

        let mid = a.step_toward(b, 2.5);
        assert!((a.distance(mid) - 2.5).abs() < 1e-9);
        assert!((mid.distance(b) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn rect_contains_and_clamp() {
        let rect = MapRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.is_valid());
        assert!(rect.contains(Coord::new(5.0, 5.0)));
        assert!(rect.contains(Coord::new(0.0, 10.0)));
        assert!(!rect.contains(Coord::new(-0.1, 5.0)));

        let clamped = rect.clamp(Coord::new(25.0, -3.0));
        assert_eq!(clamped, Coord::new(10.0, 0.0));
        assert!((rect.distance_to(Coord::new(13.0, 14.0)) - 5.0).abs() < 1e-9);
        assert_eq!(rect.distance_to(Coord::new(4.0, 4.0)), 0.0);
    }

    #[test]
    fn rect_random_point_stays_inside() {
        let rect = MapRect::new(-5.0, 2.0, 5.0, 8.0);
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert!(rect.contains(rect.random_point(&mut rng)));
        }
    }

    #[test]
    fn faction_hostility() {
        assert!(Faction(1).is_hostile_to(Faction(2)));
        assert!(!Faction(3).is_hostile_to(Faction(3)));
    }

    #[test]
    fn invalid_rect_rejected() {
        assert!(!MapRect::new(10.0, 0.0, 0.0, 10.0).is_valid());
        assert!(!MapRect::new(0.0, 5.0, 10.0, 5.0).is_valid());
    }
}
