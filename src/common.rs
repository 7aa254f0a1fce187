//! Shot outcomes and the error types shared across the engine and lobby.

use thiserror::Error;

use crate::coord::{Coord, Orientation};
use crate::game::PlayerSlot;
use crate::lobby::PlayerId;
use crate::ship::ShipType;

/// Result of a shot against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShotOutcome {
    /// The shot struck `ship`; `sunk` is set when it was the last intact cell.
    Hit { ship: ShipType, sunk: bool },
    /// The shot found open water.
    Miss,
    /// The cell had been fired at before; nothing changed.
    AlreadyFired,
}

impl ShotOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, ShotOutcome::Hit { .. })
    }

    /// Ship sunk by this shot, if any.
    pub fn sunk(&self) -> Option<ShipType> {
        match self {
            ShotOutcome::Hit { ship, sunk: true } => Some(*ship),
            _ => None,
        }
    }
}

/// Reasons a proposed fleet is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{ship} anchored at {anchor} running {orientation:?} leaves the board")]
    OutOfBounds {
        ship: ShipType,
        anchor: Coord,
        orientation: Orientation,
    },
    #[error("{first} and {second} overlap at {at}")]
    Overlap {
        first: ShipType,
        second: ShipType,
        at: Coord,
    },
    #[error("{first} and {second} touch at {at}; ships need one empty cell between them")]
    AdjacentShips {
        first: ShipType,
        second: ShipType,
        at: Coord,
    },
    #[error("a fleet needs exactly one of each ship type; missing {missing:?}")]
    WrongFleetComposition { missing: Vec<ShipType> },
    #[error("{0} is placed more than once")]
    DuplicateShipType(ShipType),
}

/// Rejected `fire` calls. The session is unchanged after either.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FireError {
    #[error("it is not this player's turn")]
    NotYourTurn,
    #[error("the game is over; {winner:?} won")]
    GameFinished { winner: PlayerSlot },
}

/// Errors returned by lobby and matchmaking operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("{0} is not in the lobby")]
    NotPresent(PlayerId),
    #[error("{0} has not placed a fleet")]
    FleetNotPlaced(PlayerId),
    #[error("{0} is already in a game")]
    AlreadyMatched(PlayerId),
    #[error("{0} has no pending match request")]
    NoPendingRequest(PlayerId),
    #[error("{0} is not in a game")]
    NotMatched(PlayerId),
    #[error("invalid fleet: {0}")]
    Validation(#[from] ValidationError),
}
