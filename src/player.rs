use rand::{rngs::SmallRng, SeedableRng};

use crate::{ai, board::TargetView, common::ShotOutcome, coord::Coord};

/// Decides where a session slot fires.
///
/// The session holds its two sources as trait objects and never asks which
/// kind it has: a source that returns a target plays immediately, one that
/// returns `None` waits for an external `fire` call.
pub trait TurnSource: Send {
    /// Choose the next target, or `None` to wait for an external shot.
    fn select_target(&mut self, view: &TargetView) -> Option<Coord>;

    /// Inform the source of the result of its last shot.
    fn handle_shot_result(&mut self, _at: Coord, _outcome: ShotOutcome) {}
}

/// A person playing through the presentation layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Human;

impl TurnSource for Human {
    fn select_target(&mut self, _view: &TargetView) -> Option<Coord> {
        None
    }
}

/// Computer opponent firing by seeded probability-density sampling.
pub struct ScriptedOpponent {
    rng: SmallRng,
}

impl ScriptedOpponent {
    /// Deterministic opponent; the same seed replays the same game.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_rng(rng: SmallRng) -> Self {
        Self { rng }
    }
}

impl TurnSource for ScriptedOpponent {
    fn select_target(&mut self, view: &TargetView) -> Option<Coord> {
        ai::choose_target(view, &mut self.rng)
    }
}
