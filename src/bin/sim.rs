use battleship_arena::{random_board, GameSession, PlayerSlot, ScriptedOpponent, SessionRules};
use rand::{rngs::SmallRng, SeedableRng};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <seed1> <seed2>", args[0]);
        std::process::exit(1);
    }
    let seed1: u64 = args[1].parse()?;
    let seed2: u64 = args[2].parse()?;

    let mut rng1 = SmallRng::seed_from_u64(seed1);
    let mut rng2 = SmallRng::seed_from_u64(seed2);
    let board1 = random_board(&mut rng1)?;
    let board2 = random_board(&mut rng2)?;

    let game = GameSession::new(
        [board1, board2],
        [
            Box::new(ScriptedOpponent::from_rng(rng1)),
            Box::new(ScriptedOpponent::from_rng(rng2)),
        ],
        SessionRules::default(),
    );

    let shots = |slot: PlayerSlot| game.shots().iter().filter(|s| s.shooter == slot).count();
    let hits = |slot: PlayerSlot| {
        game.shots()
            .iter()
            .filter(|s| s.shooter == slot && s.outcome.is_hit())
            .count()
    };
    let winner = match game.winner() {
        Some(PlayerSlot::A) => Some("player1"),
        Some(PlayerSlot::B) => Some("player2"),
        None => None,
    };

    let result = json!({
        "player1": {"shots": shots(PlayerSlot::A), "hits": hits(PlayerSlot::A)},
        "player2": {"shots": shots(PlayerSlot::B), "hits": hits(PlayerSlot::B)},
        "status": game.status(),
        "winner": winner,
    });

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
