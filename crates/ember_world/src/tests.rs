
// Scenario tests exercising the assembled simulation end to end.
#[cfg(test)]
mod tests {
    use crate::directory::CharProfile;
    use crate::intents::OP_ATTACK_MOB;
    use crate::mob::{MobPhase, MobTemplate, SpawnZone};
    use crate::store::StaticWorldStore;
    use crate::types::*;
    use crate::{BroadcastEvent, SimConfig, WorldSim};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn fast_config() -> SimConfig {
        SimConfig {
            wander_tick_ms: 20,
            combat_tick_ms: 10,
            tracker_interval_ms: 20,
            attack_commit_ms: 5,
            ..SimConfig::default()
        }
    }

    fn template(id: u32, faction: u16) -> Arc<MobTemplate> {
        Arc::new(MobTemplate {
            id: TemplateId(id),
            name: "cinder imp".to_string(),
            max_hp: 100,
            faction: Faction(faction),
            level: 4,
            walk_speed: 5.0,
            run_speed: 1000.0,
            aggro_range: None,
        })
    }

    fn zone(map: u32, count: u32, respawn_ms: u64, template: u32) -> Arc<SpawnZone> {
        Arc::new(SpawnZone {
            map: MapId(map),
            rect: MapRect::new(0.0, 0.0, 10.0, 10.0),
            count,
            respawn_ms,
            attackable: true,
            template: TemplateId(template),
        })
    }

    /// Decodes everything queued on a session receiver into JSON values.
    fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<serde_json::Value> {
        let mut decoded = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                decoded.push(value);
            }
        }
        decoded
    }

    fn is_mob_appear(value: &serde_json::Value, sight_id: SightId) -> bool {
        value.get("snapshot").is_some()
            && value
                .get("entity")
                .and_then(|e| e.get("Mob"))
                .and_then(|m| m.as_u64())
                == Some(u64::from(sight_id.0))
    }

    fn is_mob_disappear(value: &serde_json::Value, sight_id: SightId) -> bool {
        value.get("snapshot").is_none()
            && value.get("amount").is_none()
            && value
                .get("entity")
                .and_then(|e| e.get("Mob"))
                .and_then(|m| m.as_u64())
                == Some(u64::from(sight_id.0))
    }

    macro_rules! wait_until {
        ($cond:expr, $msg:expr) => {{
            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                if $cond {
                    break;
                }
                if Instant::now() >= deadline {
                    panic!("{}", $msg);
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }};
    }

    // Scenario 1: zone (0,0)-(10,10), count 3 → exactly 3 live mobs inside
    // the rect with distinct sight ids.
    #[tokio::test(flavor = "multi_thread")]
    async fn world_load_spawns_zone_population() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 3, 30_000, 1)],
            vec![template(1, 2)],
            Vec::new(),
        );

        let report = sim.load_world(&store).await.expect("world load");
        assert_eq!(report.zones_loaded, 1);
        assert_eq!(report.zones_skipped, 0);
        assert_eq!(report.mobs_spawned, 3);

        let live = sim.registry().list_live(ShardId(0), MapId(100));
        assert_eq!(live.len(), 3);

        let rect = MapRect::new(0.0, 0.0, 10.0, 10.0);
        let mut sight_ids = std::collections::HashSet::new();
        for mob in &live {
            assert!(rect.contains(mob.position().await));
            assert_eq!(mob.hp().await, 100);
            assert!(sight_ids.insert(mob.sight_id()));
        }
    }

    // A malformed zone is logged and skipped; the rest of the world loads.
    #[tokio::test(flavor = "multi_thread")]
    async fn bad_zone_is_skipped_without_aborting_load() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 3, 30_000, 1), zone(101, 0, 30_000, 1), zone(102, 2, 30_000, 77)],
            vec![template(1, 2)],
            Vec::new(),
        );

        let report = sim.load_world(&store).await.expect("world load");
        assert_eq!(report.zones_loaded, 1);
        assert_eq!(report.zones_skipped, 2);
        assert_eq!(report.mobs_spawned, 3);
    }

    // Scenario 2: a hostile player inside aggro range pulls the mob through
    // Wandering → Chasing → Attacking, and the player's HP drops.
    #[tokio::test(flavor = "multi_thread")]
    async fn hostile_player_triggers_chase_and_attack() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 1, 30_000, 1)],
            vec![template(1, 2)],
            Vec::new(),
        );
        sim.load_world(&store).await.expect("world load");

        let char_id = CharId::new();
        let (_session, _rx) = sim
            .open_session(
                char_id,
                ShardId(0),
                MapId(100),
                Coord::new(200.0, 5.0),
                CharProfile::new(10_000, Faction(1), None),
            )
            .await
            .expect("session");

        let mob = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);

        wait_until!(
            mob.state().await.phase == MobPhase::Chasing,
            "mob never started chasing"
        );
        wait_until!(
            mob.state().await.phase == MobPhase::Attacking,
            "mob never reached attack range"
        );
        wait_until!(
            sim.directory().profile(char_id).map(|p| p.hp()).unwrap_or(10_000) < 10_000,
            "player took no damage"
        );
    }

    // Scenario 3: lethal damage tears the mob down in the same tick (index
    // removal, exactly one disappear per prior observer), and the respawn
    // timer brings back a full-HP mob inside the rect.
    #[tokio::test(flavor = "multi_thread")]
    async fn death_teardown_and_respawn() {
        let sim = WorldSim::new(fast_config(), 1).await;
        // Same faction: the mob never aggroes the observer.
        let store = StaticWorldStore::new(
            vec![zone(100, 1, 500, 1)],
            vec![template(1, 1)],
            Vec::new(),
        );
        sim.load_world(&store).await.expect("world load");

        let char_id = CharId::new();
        let (session, mut rx) = sim
            .open_session(
                char_id,
                ShardId(0),
                MapId(100),
                Coord::new(5.0, 5.0),
                CharProfile::new(100, Faction(1), None),
            )
            .await
            .expect("session");

        let mob = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);
        let old_sight = mob.sight_id();

        wait_until!(session.interest.mobs.contains(old_sight).await, "mob never on sight");

        sim.dispatch_intent(
            OP_ATTACK_MOB,
            char_id,
            serde_json::json!({
                "shard": ShardId(0),
                "map": MapId(100),
                "sight_id": old_sight,
                "damage": 9_999,
            }),
        )
        .await;

        wait_until!(
            !session.interest.mobs.contains(old_sight).await,
            "dead mob still on sight"
        );
        wait_until!(
            {
                let live = sim.registry().list_live(ShardId(0), MapId(100));
                !live.is_empty() && live[0].hp().await == 100 && live[0].is_alive().await
            },
            "mob never respawned at full HP"
        );

        let respawned = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);
        assert!(respawned.zone.rect.contains(respawned.position().await));

        // Let the remaining deliveries land, then count teardown events.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let received = drain(&mut rx);
        let disappears =
            received.iter().filter(|v| is_mob_disappear(v, old_sight)).count();
        assert_eq!(disappears, 1, "observer must get exactly one disappear");
    }

    // Appear convergence: one appear event when the mob enters the AoI, no
    // duplicates on later scans.
    #[tokio::test(flavor = "multi_thread")]
    async fn appear_is_emitted_exactly_once() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 1, 30_000, 1)],
            vec![template(1, 1)],
            Vec::new(),
        );
        sim.load_world(&store).await.expect("world load");

        let char_id = CharId::new();
        let (session, mut rx) = sim
            .open_session(
                char_id,
                ShardId(0),
                MapId(100),
                Coord::new(5.0, 5.0),
                CharProfile::new(100, Faction(1), None),
            )
            .await
            .expect("session");

        let mob = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);
        let sight_id = mob.sight_id();

        wait_until!(session.interest.mobs.contains(sight_id).await, "mob never on sight");

        // Several more scan cycles must not re-announce.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let received = drain(&mut rx);
        let appears = received.iter().filter(|v| is_mob_appear(v, sight_id)).count();
        assert_eq!(appears, 1, "appear must be emitted exactly once");
    }

    // Scenario 4: near-cast on a mob reaches the session whose AoI holds it
    // and nobody else.
    #[tokio::test(flavor = "multi_thread")]
    async fn near_cast_reaches_only_observers() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 1, 30_000, 1)],
            vec![template(1, 1)],
            Vec::new(),
        );
        sim.load_world(&store).await.expect("world load");

        let near_char = CharId::new();
        let far_char = CharId::new();
        let (near_session, mut near_rx) = sim
            .open_session(
                near_char,
                ShardId(0),
                MapId(100),
                Coord::new(5.0, 5.0),
                CharProfile::new(100, Faction(1), None),
            )
            .await
            .expect("near session");
        let (far_session, mut far_rx) = sim
            .open_session(
                far_char,
                ShardId(0),
                MapId(100),
                Coord::new(5000.0, 5000.0),
                CharProfile::new(100, Faction(1), None),
            )
            .await
            .expect("far session");

        let mob = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);
        let sight_id = mob.sight_id();

        wait_until!(near_session.interest.mobs.contains(sight_id).await, "mob never on sight");
        assert!(!far_session.interest.mobs.contains(sight_id).await);

        let marker = serde_json::json!({ "marker": "near-cast-probe" });
        let event = BroadcastEvent::near_entity(
            ShardId(0),
            MapId(100),
            EntityRef::Mob(sight_id),
            &marker,
        )
        .expect("encode");
        sim.bus().publish(event).expect("publish");

        wait_until!(
            drain(&mut near_rx).iter().any(|v| v.get("marker").is_some()),
            "observer never received the near-cast"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(
            !drain(&mut far_rx).iter().any(|v| v.get("marker").is_some()),
            "near-cast leaked to an unrelated session"
        );
    }

    // Scenario 5: a delayed damage commit whose token was superseded (here by
    // the death of the caster) never lands.
    #[tokio::test(flavor = "multi_thread")]
    async fn stale_commit_is_dropped() {
        let mut config = fast_config();
        // Long cast so the kill always beats the commit.
        config.attack_commit_ms = 300;
        let sim = WorldSim::new(config, 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 1, 60_000, 1)],
            vec![template(1, 2)],
            Vec::new(),
        );
        sim.load_world(&store).await.expect("world load");

        let char_id = CharId::new();
        let (_session, _rx) = sim
            .open_session(
                char_id,
                ShardId(0),
                MapId(100),
                Coord::new(5.0, 5.0),
                CharProfile::new(10_000, Faction(1), None),
            )
            .await
            .expect("session");

        let mob = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);
        wait_until!(
            mob.state().await.phase == MobPhase::Attacking,
            "mob never started attacking"
        );

        // The mob has an attack mid-cast. Killing it bumps the token, so the
        // pending commit must be discarded.
        mob.apply_damage(char_id, 9_999).await;
        tokio::time::sleep(Duration::from_millis(600)).await;

        let hp = sim.directory().profile(char_id).map(|p| p.hp()).expect("profile");
        assert_eq!(hp, 10_000, "stale commit mutated state");
    }

    // A once-only admin spawn dies permanently: no respawn after the timer.
    #[tokio::test(flavor = "multi_thread")]
    async fn once_mob_never_respawns() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(Vec::new(), vec![template(1, 1)], Vec::new());
        sim.load_world(&store).await.expect("world load");

        sim.admin_spawn(ShardId(0), zone(100, 1, 100, 1), &store, true)
            .await
            .expect("admin spawn");
        assert_eq!(sim.registry().live_count(ShardId(0), MapId(100)), 1);

        let mob = sim.registry().list_live(ShardId(0), MapId(100)).remove(0);
        assert!(mob.once);
        mob.apply_damage(CharId::new(), 9_999).await;

        wait_until!(
            sim.registry().live_count(ShardId(0), MapId(100)) == 0,
            "once-mob never left the index"
        );
        // Well past the would-be respawn timer: still gone.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(sim.registry().live_count(ShardId(0), MapId(100)), 0);
    }

    // Sessions stop receiving and trackers retire once the session closes.
    #[tokio::test(flavor = "multi_thread")]
    async fn closed_session_is_left_alone() {
        let sim = WorldSim::new(fast_config(), 1).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 1, 30_000, 1)],
            vec![template(1, 1)],
            Vec::new(),
        );
        sim.load_world(&store).await.expect("world load");

        let char_id = CharId::new();
        let (session, _rx) = sim
            .open_session(
                char_id,
                ShardId(0),
                MapId(100),
                Coord::new(5.0, 5.0),
                CharProfile::new(100, Faction(1), None),
            )
            .await
            .expect("session");

        sim.close_session(session.id);
        assert!(!session.is_active());
        assert!(sim.sessions().by_char(char_id).is_none());
        assert!(sim.directory().profile(char_id).is_none());
    }

    // Parallel shards simulate independently: each gets its own population.
    #[tokio::test(flavor = "multi_thread")]
    async fn shards_are_simulated_independently() {
        let sim = WorldSim::new(fast_config(), 3).await;
        let store = StaticWorldStore::new(
            vec![zone(100, 2, 30_000, 1)],
            vec![template(1, 1)],
            Vec::new(),
        );
        let report = sim.load_world(&store).await.expect("world load");
        assert_eq!(report.mobs_spawned, 6);

        for shard in [ShardId(0), ShardId(1), ShardId(2)] {
            assert_eq!(sim.registry().live_count(shard, MapId(100)), 2);
        }
    }
}
