//! Standard bus subscriber: fans events out to the local sessions that match
//! the event's targeting predicate.

use super::{BroadcastEvent, BusSubscriber, Target};
use crate::events::EventError;
use crate::session::{Session, SessionRegistry};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Delivers bus events to matching local sessions.
///
/// Predicate evaluation happens here, on the receiving side: the publisher
/// only stated WHO should care (an entity, a point, a character, everyone);
/// this fan-out resolves that against the sessions this process actually
/// hosts. No match means the event is silently dropped.
pub struct SessionFanout {
    sessions: Arc<SessionRegistry>,
}

impl SessionFanout {
    /// Creates the fan-out over a session registry.
    pub fn new(sessions: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self { sessions })
    }

    /// Resolves the sessions an event should reach.
    async fn recipients(&self, target: &Target) -> Vec<Arc<Session>> {
        match target {
            Target::Global => self.sessions.all(),
            Target::Character(char_id) => {
                self.sessions.by_char(*char_id).into_iter().collect()
            }
            Target::NearEntity { shard, map, entity } => {
                let candidates = self.sessions.on_map(*shard, *map);
                let checks = join_all(
                    candidates.iter().map(|session| session.interest.contains(entity)),
                )
                .await;
                candidates
                    .into_iter()
                    .zip(checks)
                    .filter_map(|(session, on_sight)| on_sight.then_some(session))
                    .collect()
            }
            Target::NearPoint { shard, map, center, radius } => {
                let candidates = self.sessions.on_map(*shard, *map);
                let positions =
                    join_all(candidates.iter().map(|session| session.position())).await;
                candidates
                    .into_iter()
                    .zip(positions)
                    .filter_map(|(session, position)| {
                        (position.distance(*center) <= *radius).then_some(session)
                    })
                    .collect()
            }
        }
    }
}

#[async_trait]
impl BusSubscriber for SessionFanout {
    fn name(&self) -> &str {
        "session_fanout"
    }

    async fn deliver(&self, event: &BroadcastEvent) -> Result<(), EventError> {
        let recipients = self.recipients(&event.target).await;
        if recipients.is_empty() {
            debug!("📭 No local session matches target {:?}, dropping event", event.target);
            return Ok(());
        }

        // A failed session never blocks delivery to the rest.
        for session in recipients {
            if let Err(e) = session.deliver(event.payload.clone()) {
                warn!("🟡 Delivery to session {} failed: {}", session.id, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CharId, Coord, DisplayToken, EntityRef, MapId, ShardId, SightId};

    #[tokio::test]
    async fn near_entity_matches_only_aoi_holders() {
        let sessions = Arc::new(SessionRegistry::new());
        let fanout = SessionFanout::new(sessions.clone());

        let (with_sight, mut rx_a) =
            sessions.open(CharId::new(), ShardId(0), MapId(1), Coord::default());
        let (_without, mut rx_b) =
            sessions.open(CharId::new(), ShardId(0), MapId(1), Coord::default());
        with_sight.interest.mobs.insert(SightId(3), DisplayToken(3)).await;

        let event = BroadcastEvent {
            payload: b"hit".to_vec(),
            target: Target::NearEntity {
                shard: ShardId(0),
                map: MapId(1),
                entity: EntityRef::Mob(SightId(3)),
            },
        };
        fanout.deliver(&event).await.expect("deliver");

        assert_eq!(rx_a.try_recv().expect("observer got payload"), b"hit".to_vec());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn near_point_respects_radius_and_map() {
        let sessions = Arc::new(SessionRegistry::new());
        let fanout = SessionFanout::new(sessions.clone());

        let (_near, mut rx_near) =
            sessions.open(CharId::new(), ShardId(0), MapId(1), Coord::new(10.0, 0.0));
        let (_far, mut rx_far) =
            sessions.open(CharId::new(), ShardId(0), MapId(1), Coord::new(500.0, 0.0));
        let (_other_map, mut rx_other) =
            sessions.open(CharId::new(), ShardId(0), MapId(2), Coord::new(10.0, 0.0));

        let event = BroadcastEvent {
            payload: b"boom".to_vec(),
            target: Target::NearPoint {
                shard: ShardId(0),
                map: MapId(1),
                center: Coord::default(),
                radius: 100.0,
            },
        };
        fanout.deliver(&event).await.expect("deliver");

        assert!(rx_near.try_recv().is_ok());
        assert!(rx_far.try_recv().is_err());
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_session_does_not_block_others() {
        let sessions = Arc::new(SessionRegistry::new());
        let fanout = SessionFanout::new(sessions.clone());

        let (_alive, mut rx_alive) =
            sessions.open(CharId::new(), ShardId(0), MapId(1), Coord::default());
        let (_dead, rx_dead) = sessions.open(CharId::new(), ShardId(0), MapId(1), Coord::default());
        drop(rx_dead);

        let event = BroadcastEvent { payload: b"all".to_vec(), target: Target::Global };
        fanout.deliver(&event).await.expect("deliver");
        assert!(rx_alive.try_recv().is_ok());
    }
}
