use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use battleship_arena::{
    random_fleet, standard_fleet, AwaitOutcome, FinishReason, LobbyConfig, LobbyError,
    LobbyService, MatchAssignment, PlayerId, PlayerSlot, PlayerStatus, SessionStatus,
    ShotOutcome,
};
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};
use tokio::time::Instant;

fn id(name: &str) -> PlayerId {
    PlayerId::from(name)
}

fn config() -> LobbyConfig {
    LobbyConfig {
        liveness_timeout: Duration::from_secs(30),
        sweep_interval: Duration::from_secs(5),
        await_timeout: Duration::from_secs(10),
        ..LobbyConfig::default()
    }
}

async fn ready(lobby: &LobbyService, name: &str) -> PlayerId {
    let player = id(name);
    lobby.join(player.clone()).await;
    lobby.place_fleet(&player, &standard_fleet()).await.unwrap();
    player
}

async fn matched(lobby: &LobbyService, player: &PlayerId) -> MatchAssignment {
    match lobby.await_match(player, Duration::ZERO).await.unwrap() {
        AwaitOutcome::Matched(a) => a,
        AwaitOutcome::Timeout => panic!("{player} is not matched"),
    }
}

#[tokio::test]
async fn presence_and_idle_listing() {
    let lobby = LobbyService::new(config());
    assert!(lobby.join("alice").await);
    assert!(lobby.join("bob").await);
    assert!(lobby.join("carol").await);
    assert!(!lobby.join("alice").await);
    assert_eq!(lobby.player_count().await, 3);
    assert_eq!(lobby.list_idle().await, vec![id("alice"), id("bob"), id("carol")]);

    lobby.leave(&id("bob")).await.unwrap();
    assert_eq!(lobby.list_idle().await, vec![id("alice"), id("carol")]);
    assert_eq!(
        lobby.leave(&id("bob")).await,
        Err(LobbyError::NotPresent(id("bob")))
    );
    assert_eq!(
        lobby.heartbeat(&id("bob")).await,
        Err(LobbyError::NotPresent(id("bob")))
    );
    assert!(lobby.heartbeat(&id("carol")).await.is_ok());
}

#[tokio::test]
async fn request_needs_presence_and_a_fleet() {
    let lobby = LobbyService::new(config());
    assert_eq!(
        lobby.request_match(&id("ghost")).await,
        Err(LobbyError::NotPresent(id("ghost")))
    );
    lobby.join("alice").await;
    assert_eq!(
        lobby.request_match(&id("alice")).await,
        Err(LobbyError::FleetNotPlaced(id("alice")))
    );

    let mut bad = standard_fleet().to_vec();
    bad.pop();
    assert!(matches!(
        lobby.place_fleet(&id("alice"), &bad).await,
        Err(LobbyError::Validation(_))
    ));
    assert_eq!(
        lobby.await_match(&id("alice"), Duration::ZERO).await,
        Err(LobbyError::NoPendingRequest(id("alice")))
    );
}

#[tokio::test]
async fn two_requests_pair_into_one_session() {
    let lobby = LobbyService::new(config());
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    let carol = ready(&lobby, "carol").await;

    let token = lobby.request_match(&alice).await.unwrap();
    assert_eq!(token.player, alice);
    assert_eq!(lobby.request_match(&alice).await.unwrap(), token);
    assert_eq!(lobby.status(&alice).await, Some(PlayerStatus::Requesting));
    assert_eq!(lobby.list_idle().await, vec![bob.clone(), carol.clone()]);

    lobby.request_match(&bob).await.unwrap();
    assert_eq!(lobby.status(&alice).await, Some(PlayerStatus::Matched));
    assert_eq!(lobby.status(&bob).await, Some(PlayerStatus::Matched));
    assert_eq!(lobby.list_idle().await, vec![carol.clone()]);

    let a = matched(&lobby, &alice).await;
    let b = matched(&lobby, &bob).await;
    assert_eq!(a.session, b.session);
    assert_eq!(a.slot, PlayerSlot::A);
    assert_eq!(b.slot, PlayerSlot::B);
    assert_eq!(a.opponent, Some(bob.clone()));
    assert_eq!(b.opponent, Some(alice.clone()));
    assert_eq!(a.session.slot_of(&bob), Some(PlayerSlot::B));
    assert_eq!(a.session.slot_of(&carol), None);
    assert_eq!(lobby.session_count().await, 1);
    assert_eq!(lobby.session(a.session.id()).await, Some(a.session.clone()));

    assert_eq!(
        lobby.request_match(&alice).await,
        Err(LobbyError::AlreadyMatched(alice.clone()))
    );
    assert_eq!(
        lobby.place_fleet(&alice, &standard_fleet()).await,
        Err(LobbyError::AlreadyMatched(alice.clone()))
    );

    assert!(a.session.fire(a.slot, "B1".parse().unwrap()).await.is_ok());
    assert_eq!(a.session.status().await, SessionStatus::PlayerBTurn);
    let outcome = b.session.fire(b.slot, "A1".parse().unwrap()).await.unwrap();
    assert!(matches!(outcome, ShotOutcome::Hit { .. }));
}

#[tokio::test(start_paused = true)]
async fn long_poll_times_out() {
    let lobby = LobbyService::new(config());
    let alice = ready(&lobby, "alice").await;
    lobby.request_match(&alice).await.unwrap();

    let start = Instant::now();
    let outcome = lobby.await_match(&alice, Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome, AwaitOutcome::Timeout);
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(6));
    assert_eq!(lobby.status(&alice).await, Some(PlayerStatus::Requesting));

    let outcome = lobby.await_match_default(&alice).await.unwrap();
    assert_eq!(outcome, AwaitOutcome::Timeout);
    assert!(start.elapsed() >= Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn long_poll_returns_when_paired() {
    let lobby = Arc::new(LobbyService::new(config()));
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    lobby.request_match(&alice).await.unwrap();

    let start = Instant::now();
    let waiter = {
        let lobby = Arc::clone(&lobby);
        let alice = alice.clone();
        tokio::spawn(async move { lobby.await_match(&alice, Duration::from_secs(30)).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    lobby.request_match(&bob).await.unwrap();

    let outcome = waiter.await.unwrap().unwrap();
    assert!(start.elapsed() < Duration::from_secs(30));
    let AwaitOutcome::Matched(assignment) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(assignment.opponent, Some(bob));
    assert_eq!(assignment.slot, PlayerSlot::A);
}

#[tokio::test(start_paused = true)]
async fn newer_long_poll_displaces_older() {
    let lobby = Arc::new(LobbyService::new(config()));
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    lobby.request_match(&alice).await.unwrap();

    let spawn_wait = |secs| {
        let lobby = Arc::clone(&lobby);
        let alice = alice.clone();
        tokio::spawn(async move { lobby.await_match(&alice, Duration::from_secs(secs)).await })
    };
    let start = Instant::now();
    let first = spawn_wait(30);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let second = spawn_wait(30);

    assert_eq!(first.await.unwrap(), Ok(AwaitOutcome::Timeout));
    assert!(start.elapsed() < Duration::from_secs(30));

    lobby.request_match(&bob).await.unwrap();
    assert!(matches!(
        second.await.unwrap(),
        Ok(AwaitOutcome::Matched(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn leaving_cancels_the_request() {
    let lobby = Arc::new(LobbyService::new(config()));
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    lobby.request_match(&alice).await.unwrap();

    let waiter = {
        let lobby = Arc::clone(&lobby);
        let alice = alice.clone();
        tokio::spawn(async move { lobby.await_match(&alice, Duration::from_secs(30)).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    lobby.leave(&alice).await.unwrap();
    assert_eq!(
        waiter.await.unwrap(),
        Err(LobbyError::NoPendingRequest(alice.clone()))
    );

    // bob must not be paired with the departed request
    lobby.request_match(&bob).await.unwrap();
    assert_eq!(lobby.status(&bob).await, Some(PlayerStatus::Requesting));
    assert_eq!(lobby.session_count().await, 0);

    lobby.join(alice.clone()).await;
    assert_eq!(
        lobby.await_match(&alice, Duration::from_secs(1)).await,
        Err(LobbyError::NoPendingRequest(alice))
    );
}

#[tokio::test]
async fn leaving_a_game_forfeits_it() {
    let lobby = LobbyService::new(config());
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    lobby.request_match(&alice).await.unwrap();
    lobby.request_match(&bob).await.unwrap();
    let b = matched(&lobby, &bob).await;

    lobby.leave(&alice).await.unwrap();
    assert_eq!(
        b.session.status().await,
        SessionStatus::Finished {
            winner: PlayerSlot::B,
            reason: FinishReason::Forfeit,
        }
    );
    // the finished session stays listed until bob returns to the lobby
    assert_eq!(lobby.session_count().await, 1);
    assert_eq!(matched(&lobby, &bob).await.session, b.session);

    lobby.return_to_lobby(&bob).await.unwrap();
    assert_eq!(lobby.status(&bob).await, Some(PlayerStatus::Idle));
    assert_eq!(lobby.session_count().await, 0);
    assert_eq!(
        lobby.return_to_lobby(&bob).await,
        Err(LobbyError::NotMatched(bob.clone()))
    );
    assert_eq!(
        lobby.request_match(&bob).await,
        Err(LobbyError::FleetNotPlaced(bob))
    );
}

#[tokio::test]
async fn returning_mid_game_forfeits() {
    let lobby = LobbyService::new(config());
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    lobby.request_match(&alice).await.unwrap();
    lobby.request_match(&bob).await.unwrap();
    let a = matched(&lobby, &alice).await;

    lobby.return_to_lobby(&alice).await.unwrap();
    assert_eq!(a.session.status().await.winner(), Some(PlayerSlot::B));
    assert_eq!(lobby.list_idle().await, vec![alice.clone()]);

    lobby.place_fleet(&alice, &standard_fleet()).await.unwrap();
    lobby.request_match(&alice).await.unwrap();
    assert_eq!(lobby.status(&alice).await, Some(PlayerStatus::Requesting));
}

#[tokio::test(start_paused = true)]
async fn sweep_removes_silent_players() {
    let lobby = LobbyService::new(config());
    lobby.join("alice").await;
    lobby.join("bob").await;

    tokio::time::advance(Duration::from_secs(20)).await;
    lobby.heartbeat(&id("alice")).await.unwrap();
    tokio::time::advance(Duration::from_secs(15)).await;

    assert_eq!(lobby.sweep_expired().await, vec![id("bob")]);
    assert_eq!(lobby.list_idle().await, vec![id("alice")]);
    assert!(lobby.sweep_expired().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn sweep_cancels_requests_and_forfeits_games() {
    let lobby = LobbyService::new(config());
    let alice = ready(&lobby, "alice").await;
    let bob = ready(&lobby, "bob").await;
    let carol = ready(&lobby, "carol").await;
    let dave = ready(&lobby, "dave").await;
    lobby.request_match(&alice).await.unwrap();
    lobby.request_match(&bob).await.unwrap();
    lobby.request_match(&carol).await.unwrap();
    let a = matched(&lobby, &alice).await;

    tokio::time::advance(Duration::from_secs(25)).await;
    lobby.heartbeat(&alice).await.unwrap();
    lobby.heartbeat(&dave).await.unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(lobby.sweep_expired().await, vec![bob, carol]);
    assert_eq!(
        a.session.status().await,
        SessionStatus::Finished {
            winner: PlayerSlot::A,
            reason: FinishReason::Forfeit,
        }
    );
    assert_eq!(lobby.status(&alice).await, Some(PlayerStatus::Matched));

    // carol's request went with her, so dave waits alone
    lobby.request_match(&dave).await.unwrap();
    assert_eq!(lobby.status(&dave).await, Some(PlayerStatus::Requesting));
}

#[tokio::test(start_paused = true)]
async fn background_sweep_runs_until_shutdown() {
    let lobby = Arc::new(LobbyService::new(LobbyConfig {
        liveness_timeout: Duration::from_secs(3),
        sweep_interval: Duration::from_secs(1),
        ..LobbyConfig::default()
    }));
    let sweeper = lobby.spawn_liveness_sweep().unwrap();
    lobby.join("alice").await;
    lobby.join("bob").await;

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        lobby.heartbeat(&id("alice")).await.unwrap();
    }
    assert_eq!(lobby.list_idle().await, vec![id("alice")]);

    lobby.shutdown();
    assert!(lobby.is_shutdown());
    sweeper.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sweep_spawns_once() {
    let lobby = Arc::new(LobbyService::new(config()));
    let sweeper = lobby.spawn_liveness_sweep().unwrap();
    assert!(lobby.spawn_liveness_sweep().is_none());
    lobby.shutdown();
    sweeper.await.unwrap();
    // still refused after the first one stopped
    assert!(lobby.spawn_liveness_sweep().is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_a_parked_sweep_at_once() {
    let lobby = Arc::new(LobbyService::new(LobbyConfig {
        sweep_interval: Duration::from_secs(60),
        ..config()
    }));
    let started = Instant::now();
    let sweeper = lobby.spawn_liveness_sweep().unwrap();
    // let the task reach its select
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    lobby.shutdown();
    tokio::time::timeout(Duration::from_millis(1), sweeper)
        .await
        .expect("sweep did not stop on shutdown")
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn solo_game_through_the_lobby() {
    let lobby = LobbyService::new(config());
    let alice = ready(&lobby, "alice").await;
    assert_eq!(
        lobby.start_solo(&id("ghost"), 1).await,
        Err(LobbyError::NotPresent(id("ghost")))
    );

    let assignment = lobby.start_solo(&alice, 42).await.unwrap();
    assert_eq!(assignment.opponent, None);
    assert_eq!(assignment.slot, PlayerSlot::A);
    assert_eq!(lobby.status(&alice).await, Some(PlayerStatus::Matched));
    assert_eq!(matched(&lobby, &alice).await, assignment);

    let session = &assignment.session;
    session.fire(PlayerSlot::A, "J10".parse().unwrap()).await.unwrap();
    let snapshot = session.snapshot(PlayerSlot::A).await;
    assert_eq!(snapshot.shots.len(), 2);
    assert_eq!(snapshot.status, SessionStatus::PlayerATurn);

    lobby.return_to_lobby(&alice).await.unwrap();
    assert_eq!(lobby.session_count().await, 0);
    assert!(session.status().await.is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_double_pair() {
    for seed in 0..8u64 {
        let lobby = Arc::new(LobbyService::new(config()));
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut names: Vec<PlayerId> = (0..23).map(|i| PlayerId::new(format!("p{i}"))).collect();
        names.shuffle(&mut rng);

        let mut tasks = Vec::new();
        for name in names.clone() {
            let lobby = Arc::clone(&lobby);
            let mut task_rng = SmallRng::seed_from_u64(rng.random());
            tasks.push(tokio::spawn(async move {
                lobby.join(name.clone()).await;
                lobby
                    .place_fleet(&name, &random_fleet(&mut task_rng))
                    .await
                    .unwrap();
                for _ in 0..task_rng.random_range(0..4) {
                    tokio::task::yield_now().await;
                }
                lobby.request_match(&name).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut seats: HashMap<_, Vec<(PlayerId, PlayerSlot)>> = HashMap::new();
        let mut waiting = Vec::new();
        for name in &names {
            match lobby.await_match(name, Duration::ZERO).await.unwrap() {
                AwaitOutcome::Matched(a) => {
                    assert_eq!(a.session.slot_of(name), Some(a.slot));
                    seats.entry(a.session.id()).or_default().push((name.clone(), a.slot));
                }
                AwaitOutcome::Timeout => waiting.push(name.clone()),
            }
        }
        assert_eq!(waiting.len(), 1);
        assert_eq!(lobby.status(&waiting[0]).await, Some(PlayerStatus::Requesting));
        assert_eq!(seats.len(), names.len() / 2);
        assert_eq!(lobby.session_count().await, names.len() / 2);
        for players in seats.values() {
            assert_eq!(players.len(), 2);
            let slots: HashSet<PlayerSlot> = players.iter().map(|(_, s)| *s).collect();
            assert_eq!(slots.len(), 2);
        }
        assert!(lobby.list_idle().await.is_empty());
    }
}
