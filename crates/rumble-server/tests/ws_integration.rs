#[allow(dead_code)]
mod common;

use rumble_core::math::Vec3;
use rumble_core::net::messages::{
    AttackHitMsg, ChatMsg, ClientMessage, HealMsg, JoinMsg, MovementMsg, PingMsg, RespawnMsg,
    ServerMessage,
};
use rumble_core::net::protocol::PROTOCOL_VERSION;
use rumble_core::session::{LifeState, WeaponMode};
use rumble_core::team::Team;
use rumble_core::{DEFAULT_HP, DEFAULT_SPAWN};
use rumble_server::config::{LimitsConfig, ServerConfig};

use common::{
    TestServer, ws_connect, ws_join, ws_read_server_msg, ws_send_client_msg, ws_try_read_raw,
};

#[tokio::test]
async fn join_handshake() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    let (id, snapshot) = ws_join(&mut stream, "Alice", Some(Team::Red)).await;

    assert_eq!(snapshot.sessions.len(), 1);
    let me = &snapshot.sessions[&id];
    assert_eq!(me.hp, DEFAULT_HP);
    assert_eq!(me.max_hp, DEFAULT_HP);
    assert_eq!(me.position, DEFAULT_SPAWN);
    assert_eq!(me.life, LifeState::Alive);
    assert_eq!(me.team, Some(Team::Red));
    assert_eq!(me.team_color, Team::Red.color());
}

#[tokio::test]
async fn second_joiner_announced_to_first() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut alice, "Alice", Some(Team::Red)).await;

    let mut bob = ws_connect(&server.ws_url()).await;
    let (bob_id, snapshot) = ws_join(&mut bob, "Bob", Some(Team::Green)).await;
    assert_eq!(snapshot.sessions.len(), 2);

    let msg = ws_read_server_msg(&mut alice).await;
    match msg {
        ServerMessage::NewPlayer(m) => {
            assert_eq!(m.session.id, bob_id);
            assert_eq!(m.session.username, "Bob");
        },
        other => panic!("Expected NewPlayer, got: {other:?}"),
    }
    let msg = ws_read_server_msg(&mut alice).await;
    match msg {
        ServerMessage::TeamCounts(m) => {
            assert_eq!(m.counts.get(Team::Red), 1);
            assert_eq!(m.counts.get(Team::Green), 1);
        },
        other => panic!("Expected TeamCounts, got: {other:?}"),
    }
}

#[tokio::test]
async fn movement_rebroadcast_carries_server_timestamp() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut alice, "Alice", None).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let (bob_id, _) = ws_join(&mut bob, "Bob", None).await;
    // Alice consumes Bob's join announcements
    let _ = ws_read_server_msg(&mut alice).await;
    let _ = ws_read_server_msg(&mut alice).await;

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::Movement(MovementMsg {
            position: Vec3::new(2.0, 6.0, -3.0),
            rotation: Vec3::new(0.0, 1.5, 0.0),
            anim_state: "run".to_string(),
            weapon_mode: WeaponMode::Melee,
        }),
    )
    .await;

    let msg = ws_read_server_msg(&mut alice).await;
    match msg {
        ServerMessage::PlayerMoved(m) => {
            assert_eq!(m.id, bob_id);
            assert!(m.timestamp > 0);
            assert_eq!(m.position, Vec3::new(2.0, 6.0, -3.0));
            assert_eq!(m.anim_state, "run");
            assert_eq!(m.weapon_mode, WeaponMode::Melee);
        },
        other => panic!("Expected PlayerMoved, got: {other:?}"),
    }

    // The mover is not echoed its own movement.
    assert!(ws_try_read_raw(&mut bob, 200).await.is_none());
}

#[tokio::test]
async fn attack_updates_health_for_everyone() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let (alice_id, _) = ws_join(&mut alice, "Alice", Some(Team::Red)).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut bob, "Bob", Some(Team::Green)).await;
    let _ = ws_read_server_msg(&mut alice).await; // NewPlayer
    let _ = ws_read_server_msg(&mut alice).await; // TeamCounts

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::AttackHit(AttackHitMsg {
            target_id: alice_id,
            damage: 30,
            hit_position: Some(DEFAULT_SPAWN),
        }),
    )
    .await;

    let msg = ws_read_server_msg(&mut bob).await;
    assert!(matches!(
        msg,
        ServerMessage::HealthUpdate(m) if m.id == alice_id && m.hp == 70
    ));

    // The victim additionally receives a private damage notice.
    let msg = ws_read_server_msg(&mut alice).await;
    assert!(matches!(
        msg,
        ServerMessage::HealthUpdate(m) if m.id == alice_id && m.hp == 70
    ));
    let msg = ws_read_server_msg(&mut alice).await;
    assert!(matches!(
        msg,
        ServerMessage::DamageTaken(m) if m.id == alice_id && m.damage == 30
    ));
}

#[tokio::test]
async fn lethal_hit_broadcasts_death_and_score() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let (alice_id, _) = ws_join(&mut alice, "Alice", Some(Team::Red)).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let (bob_id, _) = ws_join(&mut bob, "Bob", Some(Team::Green)).await;
    let _ = ws_read_server_msg(&mut alice).await;
    let _ = ws_read_server_msg(&mut alice).await;

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::AttackHit(AttackHitMsg {
            target_id: alice_id,
            damage: DEFAULT_HP,
            hit_position: Some(DEFAULT_SPAWN),
        }),
    )
    .await;

    let msg = ws_read_server_msg(&mut bob).await;
    assert!(matches!(
        msg,
        ServerMessage::HealthUpdate(m) if m.id == alice_id && m.hp == 0
    ));
    let msg = ws_read_server_msg(&mut bob).await;
    match msg {
        ServerMessage::PlayerDied(m) => {
            assert_eq!(m.id, alice_id);
            assert_eq!(m.killer_id, bob_id);
        },
        other => panic!("Expected PlayerDied, got: {other:?}"),
    }
    let msg = ws_read_server_msg(&mut bob).await;
    match msg {
        ServerMessage::MatchStats(stats) => {
            assert_eq!(stats.player_kills.get(&bob_id), Some(&1));
            assert_eq!(stats.team_kills.get(Team::Green), 1);
        },
        other => panic!("Expected MatchStats, got: {other:?}"),
    }
}

#[tokio::test]
async fn respawn_restores_the_fallen() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let (alice_id, _) = ws_join(&mut alice, "Alice", Some(Team::Red)).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut bob, "Bob", Some(Team::Green)).await;
    let _ = ws_read_server_msg(&mut alice).await;
    let _ = ws_read_server_msg(&mut alice).await;

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::AttackHit(AttackHitMsg {
            target_id: alice_id,
            damage: DEFAULT_HP,
            hit_position: Some(DEFAULT_SPAWN),
        }),
    )
    .await;
    // Alice sees her own death sequence.
    let _ = ws_read_server_msg(&mut alice).await; // HealthUpdate 0
    let _ = ws_read_server_msg(&mut alice).await; // DamageTaken
    let _ = ws_read_server_msg(&mut alice).await; // PlayerDied
    let _ = ws_read_server_msg(&mut alice).await; // MatchStats

    ws_send_client_msg(
        &mut alice,
        &ClientMessage::Respawn(RespawnMsg {
            position: Some(Vec3::new(4.0, 6.0, 4.0)),
            rotation: None,
        }),
    )
    .await;

    let msg = ws_read_server_msg(&mut alice).await;
    assert!(matches!(
        msg,
        ServerMessage::HealthUpdate(m) if m.id == alice_id && m.hp == DEFAULT_HP
    ));
    let msg = ws_read_server_msg(&mut alice).await;
    match msg {
        ServerMessage::PlayerRespawned(m) => {
            assert_eq!(m.session.id, alice_id);
            assert_eq!(m.session.life, LifeState::Alive);
            assert_eq!(m.session.position, Vec3::new(4.0, 6.0, 4.0));
        },
        other => panic!("Expected PlayerRespawned, got: {other:?}"),
    }
}

#[tokio::test]
async fn heal_is_self_only_and_clamped() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let (alice_id, _) = ws_join(&mut alice, "Alice", Some(Team::Red)).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut bob, "Bob", Some(Team::Green)).await;
    let _ = ws_read_server_msg(&mut alice).await;
    let _ = ws_read_server_msg(&mut alice).await;

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::AttackHit(AttackHitMsg {
            target_id: alice_id,
            damage: 40,
            hit_position: Some(DEFAULT_SPAWN),
        }),
    )
    .await;
    let _ = ws_read_server_msg(&mut alice).await; // HealthUpdate 60
    let _ = ws_read_server_msg(&mut alice).await; // DamageTaken

    // Overheal clamps at max.
    ws_send_client_msg(&mut alice, &ClientMessage::Heal(HealMsg { amount: 200 })).await;
    let msg = ws_read_server_msg(&mut alice).await;
    assert!(matches!(
        msg,
        ServerMessage::HealthUpdate(m) if m.id == alice_id && m.hp == DEFAULT_HP
    ));
}

#[tokio::test]
async fn arena_full_join_is_refused_with_notice() {
    let config = ServerConfig {
        limits: LimitsConfig {
            max_sessions: 2,
            ..LimitsConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;

    let mut a = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut a, "A", None).await;
    let mut b = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut b, "B", None).await;

    let mut c = ws_connect(&server.ws_url()).await;
    ws_send_client_msg(
        &mut c,
        &ClientMessage::Join(JoinMsg {
            username: Some("C".to_string()),
            team: None,
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;

    let msg = ws_read_server_msg(&mut c).await;
    match msg {
        ServerMessage::ServerNotice(m) => assert_eq!(m.message, "Server full!"),
        other => panic!("Expected ServerNotice, got: {other:?}"),
    }
}

#[tokio::test]
async fn protocol_mismatch_is_refused_with_notice() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    ws_send_client_msg(
        &mut stream,
        &ClientMessage::Join(JoinMsg {
            username: Some("Old".to_string()),
            team: None,
            protocol_version: 99,
        }),
    )
    .await;

    let msg = ws_read_server_msg(&mut stream).await;
    match msg {
        ServerMessage::ServerNotice(m) => {
            assert!(m.message.contains("Protocol version mismatch"));
        },
        other => panic!("Expected ServerNotice, got: {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_is_broadcast() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut alice, "Alice", Some(Team::Red)).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let (bob_id, _) = ws_join(&mut bob, "Bob", Some(Team::Green)).await;
    let _ = ws_read_server_msg(&mut alice).await;
    let _ = ws_read_server_msg(&mut alice).await;

    drop(bob);

    let msg = ws_read_server_msg(&mut alice).await;
    assert!(matches!(
        msg,
        ServerMessage::PlayerDisconnected(m) if m.id == bob_id
    ));
    let msg = ws_read_server_msg(&mut alice).await;
    match msg {
        ServerMessage::TeamCounts(m) => {
            assert_eq!(m.counts.get(Team::Green), 0);
            assert_eq!(m.counts.get(Team::Red), 1);
        },
        other => panic!("Expected TeamCounts, got: {other:?}"),
    }
}

#[tokio::test]
async fn chat_reaches_everyone() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut alice, "Alice", None).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let (bob_id, _) = ws_join(&mut bob, "Bob", None).await;
    let _ = ws_read_server_msg(&mut alice).await;
    let _ = ws_read_server_msg(&mut alice).await;

    ws_send_client_msg(
        &mut bob,
        &ClientMessage::Chat(ChatMsg {
            content: "gg everyone".to_string(),
        }),
    )
    .await;

    for stream in [&mut alice, &mut bob] {
        let msg = ws_read_server_msg(stream).await;
        match msg {
            ServerMessage::Chat(ref m) => {
                assert_eq!(m.id, bob_id);
                assert_eq!(m.username, "Bob");
                assert_eq!(m.content, "gg everyone");
            },
            other => panic!("Expected Chat, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn ping_round_trip() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;
    let _ = ws_join(&mut stream, "Alice", None).await;

    ws_send_client_msg(&mut stream, &ClientMessage::Ping(PingMsg { timestamp: 777 })).await;
    let msg = ws_read_server_msg(&mut stream).await;
    assert!(matches!(msg, ServerMessage::Pong(m) if m.timestamp == 777));
}

#[tokio::test]
async fn first_frame_must_be_join() {
    use futures::StreamExt;

    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    // A non-join first message gets the socket dropped without a session.
    ws_send_client_msg(&mut stream, &ClientMessage::Ping(PingMsg { timestamp: 1 })).await;
    let next = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
        .await
        .expect("server should close the socket");
    match next {
        None
        | Some(Ok(tokio_tungstenite::tungstenite::Message::Close(_)))
        | Some(Err(_)) => {},
        other => panic!("Expected socket close, got: {other:?}"),
    }
}
