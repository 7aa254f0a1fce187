//! Game session: two boards, two turn sources and the turn state machine.

use core::fmt;

use log::{debug, info, warn};

use crate::{
    board::{Board, BoardView},
    common::{FireError, ShotOutcome},
    config::{SessionRules, BOARD_SIZE},
    coord::Coord,
    player::{Human, ScriptedOpponent, TurnSource},
};

/// Consecutive scripted shots one `fire` may trigger: enough for two scripted
/// sources to clear both boards.
const MAX_SCRIPTED_SHOTS: usize = 2 * BOARD_SIZE as usize * BOARD_SIZE as usize + 2;

/// One of the two seats in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayerSlot {
    A,
    B,
}

impl PlayerSlot {
    pub const fn opponent(self) -> Self {
        match self {
            PlayerSlot::A => PlayerSlot::B,
            PlayerSlot::B => PlayerSlot::A,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            PlayerSlot::A => 0,
            PlayerSlot::B => 1,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerSlot::A => f.write_str("player A"),
            PlayerSlot::B => f.write_str("player B"),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FinishReason {
    FleetDestroyed,
    /// The loser conceded, left, or stopped sending heartbeats.
    Forfeit,
}

/// Turn state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionStatus {
    /// Both boards placed, no shot fired yet.
    AwaitingFirstMove,
    PlayerATurn,
    PlayerBTurn,
    Finished {
        winner: PlayerSlot,
        reason: FinishReason,
    },
}

impl SessionStatus {
    fn turn_of(slot: PlayerSlot) -> Self {
        match slot {
            PlayerSlot::A => SessionStatus::PlayerATurn,
            PlayerSlot::B => SessionStatus::PlayerBTurn,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SessionStatus::Finished { .. })
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        match self {
            SessionStatus::Finished { winner, .. } => Some(*winner),
            _ => None,
        }
    }
}

/// One accepted shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShotRecord {
    pub shooter: PlayerSlot,
    pub at: Coord,
    pub outcome: ShotOutcome,
}

/// Serializable picture of a session from one slot's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSnapshot {
    pub viewer: PlayerSlot,
    pub status: SessionStatus,
    pub own_board: BoardView,
    pub target_board: BoardView,
    pub shots: Vec<ShotRecord>,
}

/// A game between two boards.
///
/// `fire` calls are serialized by the turn state: a call from the slot that is
/// not on move is rejected, never queued.
pub struct GameSession {
    boards: [Board; 2],
    sources: [Box<dyn TurnSource>; 2],
    status: SessionStatus,
    rules: SessionRules,
    shots: Vec<ShotRecord>,
}

impl GameSession {
    /// Starts a session. Scripted sources on move play straight away.
    pub fn new(boards: [Board; 2], sources: [Box<dyn TurnSource>; 2], rules: SessionRules) -> Self {
        let mut session = GameSession {
            boards,
            sources,
            status: SessionStatus::AwaitingFirstMove,
            rules,
            shots: Vec::new(),
        };
        session.play_scripted();
        session
    }

    pub fn human_vs_human(a: Board, b: Board, rules: SessionRules) -> Self {
        Self::new([a, b], [Box::new(Human), Box::new(Human)], rules)
    }

    /// The human takes slot A; the scripted opponent plays slot B.
    pub fn single_player(
        human: Board,
        opponent_board: Board,
        opponent: ScriptedOpponent,
        rules: SessionRules,
    ) -> Self {
        Self::new(
            [human, opponent_board],
            [Box::new(Human), Box::new(opponent)],
            rules,
        )
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn rules(&self) -> SessionRules {
        self.rules
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.status.winner()
    }

    /// Slot allowed to fire next, `None` once finished.
    pub fn to_move(&self) -> Option<PlayerSlot> {
        match self.status {
            SessionStatus::AwaitingFirstMove => Some(self.rules.first_mover),
            SessionStatus::PlayerATurn => Some(PlayerSlot::A),
            SessionStatus::PlayerBTurn => Some(PlayerSlot::B),
            SessionStatus::Finished { .. } => None,
        }
    }

    /// Fires at the opponent of `shooter`.
    ///
    /// Repeating a cell yields [`ShotOutcome::AlreadyFired`] and the shooter
    /// stays on move.
    pub fn fire(&mut self, shooter: PlayerSlot, at: Coord) -> Result<ShotOutcome, FireError> {
        let outcome = self.resolve(shooter, at)?;
        self.play_scripted();
        Ok(outcome)
    }

    /// Ends a running session in favour of the other slot. Returns `false` if
    /// the session had already finished.
    pub fn forfeit(&mut self, quitter: PlayerSlot) -> bool {
        if self.status.is_finished() {
            return false;
        }
        let winner = quitter.opponent();
        info!("{} forfeits; {} wins", quitter, winner);
        self.status = SessionStatus::Finished {
            winner,
            reason: FinishReason::Forfeit,
        };
        true
    }

    pub fn board(&self, slot: PlayerSlot) -> &Board {
        &self.boards[slot.index()]
    }

    /// `slot`'s own board with its ships revealed.
    pub fn own_view(&self, slot: PlayerSlot) -> BoardView {
        self.boards[slot.index()].own_view()
    }

    /// The opponent's board as `slot` is allowed to see it.
    pub fn target_view(&self, slot: PlayerSlot) -> BoardView {
        self.boards[slot.opponent().index()].opponent_view()
    }

    /// Accepted shots in the order they were fired.
    pub fn shots(&self) -> &[ShotRecord] {
        &self.shots
    }

    pub fn snapshot(&self, viewer: PlayerSlot) -> SessionSnapshot {
        SessionSnapshot {
            viewer,
            status: self.status,
            own_board: self.own_view(viewer),
            target_board: self.target_view(viewer),
            shots: self.shots.clone(),
        }
    }

    fn resolve(&mut self, shooter: PlayerSlot, at: Coord) -> Result<ShotOutcome, FireError> {
        if let SessionStatus::Finished { winner, .. } = self.status {
            return Err(FireError::GameFinished { winner });
        }
        if self.to_move() != Some(shooter) {
            return Err(FireError::NotYourTurn);
        }

        let target = shooter.opponent();
        let outcome = self.boards[target.index()].receive_shot(at);
        if outcome == ShotOutcome::AlreadyFired {
            return Ok(outcome);
        }
        self.shots.push(ShotRecord {
            shooter,
            at,
            outcome,
        });
        self.sources[shooter.index()].handle_shot_result(at, outcome);

        self.status = if self.boards[target.index()].is_defeated() {
            info!("{} sank the last ship at {}", shooter, at);
            SessionStatus::Finished {
                winner: shooter,
                reason: FinishReason::FleetDestroyed,
            }
        } else if self.rules.extra_turn_on_hit && outcome.is_hit() {
            SessionStatus::turn_of(shooter)
        } else {
            SessionStatus::turn_of(target)
        };
        debug!("{} fired at {}: {:?}, now {:?}", shooter, at, outcome, self.status);
        Ok(outcome)
    }

    /// Lets scripted sources fire until a human is on move or the game ends.
    fn play_scripted(&mut self) {
        for _ in 0..MAX_SCRIPTED_SHOTS {
            let Some(slot) = self.to_move() else {
                return;
            };
            let view = self.boards[slot.opponent().index()].target_view();
            let Some(at) = self.sources[slot.index()].select_target(&view) else {
                return;
            };
            match self.resolve(slot, at) {
                Ok(ShotOutcome::AlreadyFired) => {
                    warn!("scripted {} chose {} twice", slot, at);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("scripted {} could not fire: {}", slot, e);
                    return;
                }
            }
        }
    }
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("status", &self.status)
            .field("rules", &self.rules)
            .field("shots", &self.shots.len())
            .finish()
    }
}
