use std::io;
use std::sync::Arc;

use battleship_arena::{
    choose_target, init_logging, random_fleet,
    ui::{self, Command},
    AwaitOutcome, FireError, LobbyConfig, LobbyService, MatchAssignment, PlayerId, PlayerSlot,
    SessionRules, SessionSnapshot,
};
use clap::Parser;
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Play against the scripted opponent in this terminal.
    Solo {
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        /// Let the scripted strategy fire for you as well.
        #[arg(long)]
        auto: bool,
        /// A hit keeps the shooter on move.
        #[arg(long)]
        extra_turn_on_hit: bool,
    },
    /// Run a crowd of scripted clients through the lobby concurrently.
    Lobby {
        #[arg(long, default_value_t = 8)]
        players: usize,
        #[arg(long, help = "Fix RNG seed for reproducible fleets (e.g., --seed 12345)")]
        seed: Option<u64>,
        /// Long-poll bound in milliseconds.
        #[arg(long, default_value_t = 500)]
        await_ms: u64,
    },
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solo {
            seed,
            auto,
            extra_turn_on_hit,
        } => {
            if let Some(s) = seed {
                println!("Using fixed seed: {} (game will be reproducible)", s);
            }
            let config = LobbyConfig {
                rules: SessionRules {
                    extra_turn_on_hit,
                    ..SessionRules::default()
                },
                ..LobbyConfig::default()
            };
            run_solo(LobbyService::new(config), seed, auto).await?;
        }
        Commands::Lobby {
            players,
            seed,
            await_ms,
        } => {
            let config = LobbyConfig {
                await_timeout: Duration::from_millis(await_ms),
                sweep_interval: Duration::from_millis(await_ms),
                ..LobbyConfig::default()
            };
            run_lobby(Arc::new(LobbyService::new(config)), players, seed).await?;
        }
    }
    Ok(())
}

async fn run_solo(lobby: LobbyService, seed: Option<u64>, auto: bool) -> anyhow::Result<()> {
    let mut rng = make_rng(seed);
    let me = PlayerId::from("you");
    lobby.join(me.clone()).await;

    let fleet = if auto {
        random_fleet(&mut rng)
    } else {
        let stdin = io::stdin();
        match ui::prompt_fleet(&mut stdin.lock(), &mut rng)? {
            Some(fleet) => fleet,
            None => return Ok(()),
        }
    };
    lobby.place_fleet(&me, &fleet).await?;

    let opponent_seed = seed.map_or_else(rand::random, |s| s.wrapping_add(1));
    let MatchAssignment { session, slot, .. } = lobby.start_solo(&me, opponent_seed).await?;

    loop {
        let (snapshot, target) = {
            let game = session.lock().await;
            (game.snapshot(slot), game.board(slot.opponent()).target_view())
        };
        ui::print_player_view(&snapshot);
        if let Some(winner) = snapshot.status.winner() {
            if winner == slot {
                println!("You win after {} shots.", shots_by(&snapshot, slot));
            } else {
                println!("The scripted opponent wins.");
            }
            break;
        }

        let at = if auto {
            match choose_target(&target, &mut rng) {
                Some(at) => at,
                None => break,
            }
        } else {
            let stdin = io::stdin();
            match ui::prompt_command(&mut stdin.lock())? {
                Some(Command::Fire(at)) => at,
                Some(Command::Hint) => {
                    ui::print_hint(&target);
                    continue;
                }
                Some(Command::Quit) | None => {
                    lobby.return_to_lobby(&me).await?;
                    println!("You left the game.");
                    return Ok(());
                }
            }
        };

        match session.fire(slot, at).await {
            Ok(outcome) => println!("{}", ui::describe(at, outcome)),
            Err(FireError::NotYourTurn) => println!("Not your turn."),
            Err(e @ FireError::GameFinished { .. }) => println!("{e}"),
        }
    }
    lobby.return_to_lobby(&me).await?;
    Ok(())
}

fn shots_by(snapshot: &SessionSnapshot, slot: PlayerSlot) -> usize {
    snapshot.shots.iter().filter(|s| s.shooter == slot).count()
}

async fn run_lobby(lobby: Arc<LobbyService>, players: usize, seed: Option<u64>) -> anyhow::Result<()> {
    let sweeper = lobby.spawn_liveness_sweep();
    let base = seed.unwrap_or_else(rand::random);

    let mut clients = Vec::with_capacity(players);
    for i in 0..players {
        let lobby = Arc::clone(&lobby);
        let id = PlayerId::new(format!("client-{i}"));
        let rng = SmallRng::seed_from_u64(base.wrapping_add(i as u64));
        clients.push(tokio::spawn(run_client(lobby, id, rng)));
    }

    let mut wins = 0usize;
    let mut unmatched = 0usize;
    for client in clients {
        match client.await? {
            Ok(true) => wins += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("client failed: {e}");
                unmatched += 1;
            }
        }
    }
    lobby.shutdown();
    if let Some(sweeper) = sweeper {
        sweeper.await?;
    }
    println!(
        "{} players, {} games won, {} without a game, {} sessions still open",
        players,
        wins,
        unmatched,
        lobby.session_count().await
    );
    Ok(())
}

/// One scripted client: join, queue, play to the end, leave. Returns whether it won.
async fn run_client(lobby: Arc<LobbyService>, id: PlayerId, mut rng: SmallRng) -> anyhow::Result<bool> {
    lobby.join(id.clone()).await;
    lobby.place_fleet(&id, &random_fleet(&mut rng)).await?;
    lobby.request_match(&id).await?;

    let mut assignment = None;
    for _ in 0..3 {
        match lobby.await_match_default(&id).await? {
            AwaitOutcome::Matched(a) => {
                assignment = Some(a);
                break;
            }
            AwaitOutcome::Timeout => lobby.heartbeat(&id).await?,
        }
    }
    let Some(MatchAssignment {
        session,
        slot,
        opponent,
    }) = assignment
    else {
        lobby.leave(&id).await?;
        anyhow::bail!("{id} found no opponent");
    };
    info!(
        "{} plays {} against {}",
        id,
        session.id(),
        opponent.map_or_else(|| "the script".to_string(), |o| o.to_string())
    );

    loop {
        let target = {
            let game = session.lock().await;
            if game.is_finished() {
                break;
            }
            (game.to_move() == Some(slot)).then(|| game.board(slot.opponent()).target_view())
        };
        match target.and_then(|view| choose_target(&view, &mut rng)) {
            Some(at) => match session.fire(slot, at).await {
                Ok(_) | Err(FireError::NotYourTurn) => {}
                Err(FireError::GameFinished { .. }) => break,
            },
            None => tokio::time::sleep(Duration::from_millis(5)).await,
        }
        lobby.heartbeat(&id).await?;
    }

    let won = session.status().await.winner() == Some(slot);
    lobby.return_to_lobby(&id).await?;
    lobby.leave(&id).await?;
    Ok(won)
}
