//! Session registry for local player connections.
//!
//! This is the delivery endpoint of the distribution layer: every active
//! character on this process has one [`Session`] holding its live position,
//! its area-of-interest state, and the outbound payload queue its connection
//! read loop drains. The broadcast bus fans targeted events out through this
//! registry.

use crate::events::EventError;
use crate::interest::PlayerInterestState;
use crate::types::{CharId, Coord, MapId, ShardId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// Sequential identifier for a local session.
pub type SessionId = usize;

/// One active character's presence on this process.
#[derive(Debug)]
pub struct Session {
    /// Local session id
    pub id: SessionId,
    /// The character this session plays
    pub char_id: CharId,
    /// Shard the character is on
    pub shard: ShardId,
    /// Map the character is on
    pub map: MapId,
    /// Live position, updated by decoded movement intents
    position: RwLock<Coord>,
    /// The character's five-category AoI state
    pub interest: Arc<PlayerInterestState>,
    /// Outbound queue drained by the connection's write loop
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    /// Liveness flag checked by the interest tracker each cycle
    active: AtomicBool,
}

impl Session {
    /// Current position of the character.
    pub async fn position(&self) -> Coord {
        *self.position.read().await
    }

    /// Updates the character's position.
    pub async fn set_position(&self, position: Coord) {
        *self.position.write().await = position;
    }

    /// Returns true while the session has not been closed.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Queues an already-serialized payload for this connection.
    ///
    /// Fails when the connection's write loop has gone away; callers log and
    /// continue with the remaining sessions.
    pub fn deliver(&self, payload: Vec<u8>) -> Result<(), EventError> {
        self.outbound
            .send(payload)
            .map_err(|_| EventError::Delivery(format!("session {} outbound queue closed", self.id)))
    }

    fn close(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Central registry of the sessions connected to this process.
///
/// Lock-free maps keyed by session id and character id; session ids come from
/// an atomic counter.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    by_char: DashMap<CharId, SessionId>,
    next_id: AtomicUsize,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            by_char: DashMap::new(),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Opens a session for a character at the given location.
    ///
    /// Returns the session handle and the receiver its connection write loop
    /// should drain.
    pub fn open(
        &self,
        char_id: CharId,
        shard: ShardId,
        map: MapId,
        position: Coord,
    ) -> (Arc<Session>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session {
            id,
            char_id,
            shard,
            map,
            position: RwLock::new(position),
            interest: Arc::new(PlayerInterestState::new()),
            outbound: tx,
            active: AtomicBool::new(true),
        });
        self.sessions.insert(id, session.clone());
        self.by_char.insert(char_id, id);
        info!("🔗 Session {} opened for character {} on {} {}", id, char_id, shard, map);
        (session, rx)
    }

    /// Closes a session: clears the liveness flag (stopping its tracker at
    /// the top of the next cycle) and removes it from the registry.
    pub fn close(&self, id: SessionId) {
        if let Some((_, session)) = self.sessions.remove(&id) {
            session.close();
            self.by_char.remove(&session.char_id);
            info!("❌ Session {} for character {} closed", id, session.char_id);
        }
    }

    /// Looks up a session by id.
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// Looks up the session currently playing a character.
    pub fn by_char(&self, char_id: CharId) -> Option<Arc<Session>> {
        let id = self.by_char.get(&char_id).map(|entry| *entry)?;
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// All sessions on one (shard, map).
    pub fn on_map(&self, shard: ShardId, map: MapId) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|s| s.shard == shard && s.map == map)
            .map(|s| s.clone())
            .collect()
    }

    /// All sessions on this process.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| s.clone()).collect()
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_assigns_distinct_ids_and_indexes_by_char() {
        let registry = SessionRegistry::new();
        let a = CharId::new();
        let b = CharId::new();
        let (sa, _rx_a) = registry.open(a, ShardId(0), MapId(1), Coord::default());
        let (sb, _rx_b) = registry.open(b, ShardId(0), MapId(1), Coord::default());

        assert_ne!(sa.id, sb.id);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_char(a).map(|s| s.id), Some(sa.id));
        assert_eq!(registry.on_map(ShardId(0), MapId(1)).len(), 2);
        assert!(registry.on_map(ShardId(1), MapId(1)).is_empty());
    }

    #[tokio::test]
    async fn close_clears_liveness_and_lookup() {
        let registry = SessionRegistry::new();
        let char_id = CharId::new();
        let (session, _rx) = registry.open(char_id, ShardId(0), MapId(9), Coord::default());
        assert!(session.is_active());

        registry.close(session.id);
        assert!(!session.is_active());
        assert!(registry.by_char(char_id).is_none());
        assert!(registry.get(session.id).is_none());
    }

    #[tokio::test]
    async fn deliver_reaches_the_outbound_queue() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.open(CharId::new(), ShardId(0), MapId(2), Coord::default());
        session.deliver(b"payload".to_vec()).expect("queue open");
        assert_eq!(rx.recv().await.expect("delivered"), b"payload".to_vec());

        drop(rx);
        assert!(session.deliver(b"late".to_vec()).is_err());
    }
}
