//! Game board state: one validated fleet plus the shots it has received.

use core::fmt;

use log::debug;

use crate::common::ShotOutcome;
use crate::config::BOARD_SIZE;
use crate::coord::Coord;
use crate::grid::CellSet;
use crate::ship::{Ship, ShipType};

const N: usize = BOARD_SIZE as usize;

/// What one cell looks like from a given perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellView {
    /// Not fired at, and either open water or hidden from this viewer.
    Unknown,
    Hit,
    Miss,
    /// Intact ship segment, only ever shown on the owner's own board.
    Ship,
}

impl CellView {
    fn symbol(self) -> char {
        match self {
            CellView::Unknown => '.',
            CellView::Hit => 'X',
            CellView::Miss => 'o',
            CellView::Ship => 'S',
        }
    }
}

/// Read-only projection of a whole board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardView {
    cells: [[CellView; N]; N],
}

impl BoardView {
    pub fn cell(&self, at: Coord) -> CellView {
        self.cells[at.row() as usize][at.col() as usize]
    }

    pub fn rows(&self) -> &[[CellView; N]; N] {
        &self.cells
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for c in 1..=N {
            write!(f, "{:>3}", c)?;
        }
        writeln!(f)?;
        for (r, row) in self.cells.iter().enumerate() {
            write!(f, " {}", (b'A' + r as u8) as char)?;
            for cell in row {
                write!(f, "{:>3}", cell.symbol())?;
            }
            if r + 1 < N {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Everything a shooter is allowed to know about the board it fires at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetView {
    pub hits: CellSet,
    pub misses: CellSet,
    /// Ship types not yet sunk. Sinkings are announced, so this is public.
    pub remaining: Vec<ShipType>,
}

impl TargetView {
    /// Cells already fired at.
    pub fn fired(&self) -> CellSet {
        self.hits | self.misses
    }
}

/// One player's board: ships, hits and misses.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    ships: Vec<Ship>,
    ship_map: CellSet,
    hits: CellSet,
    misses: CellSet,
}

impl Board {
    /// Assembles a board from ships that already passed validation.
    pub(crate) fn from_ships(ships: Vec<Ship>) -> Self {
        let ship_map = ships
            .iter()
            .fold(CellSet::new(), |acc, s| acc | s.mask());
        Board {
            ships,
            ship_map,
            hits: CellSet::new(),
            misses: CellSet::new(),
        }
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Union of every ship's cells.
    pub fn ship_map(&self) -> CellSet {
        self.ship_map
    }

    pub fn hits(&self) -> CellSet {
        self.hits
    }

    pub fn misses(&self) -> CellSet {
        self.misses
    }

    /// Number of distinct cells fired at so far.
    pub fn shots_received(&self) -> usize {
        self.hits.len() + self.misses.len()
    }

    /// Resolves an incoming shot.
    ///
    /// A repeat shot reports [`ShotOutcome::AlreadyFired`] and leaves the board
    /// untouched. Otherwise the ship's hit set and the board's shot record are
    /// updated together.
    pub fn receive_shot(&mut self, at: Coord) -> ShotOutcome {
        if self.hits.contains(at) || self.misses.contains(at) {
            return ShotOutcome::AlreadyFired;
        }
        match self.ships.iter_mut().find(|s| s.occupies(at)) {
            Some(ship) => {
                ship.register_hit(at);
                self.hits.insert(at);
                let outcome = ShotOutcome::Hit {
                    ship: ship.ship_type(),
                    sunk: ship.is_sunk(),
                };
                debug!("shot at {} -> {:?}", at, outcome);
                outcome
            }
            None => {
                self.misses.insert(at);
                debug!("shot at {} -> miss", at);
                ShotOutcome::Miss
            }
        }
    }

    /// `true` once every ship is sunk.
    pub fn is_defeated(&self) -> bool {
        self.ships.iter().all(Ship::is_sunk)
    }

    /// Ship types still afloat, in fleet order.
    pub fn remaining_ships(&self) -> Vec<ShipType> {
        self.ships
            .iter()
            .filter(|s| !s.is_sunk())
            .map(Ship::ship_type)
            .collect()
    }

    /// Status of one cell; `reveal` shows intact ship segments.
    pub fn cell(&self, at: Coord, reveal: bool) -> CellView {
        if self.hits.contains(at) {
            CellView::Hit
        } else if self.misses.contains(at) {
            CellView::Miss
        } else if reveal && self.ship_map.contains(at) {
            CellView::Ship
        } else {
            CellView::Unknown
        }
    }

    /// The board as its owner sees it.
    pub fn own_view(&self) -> BoardView {
        self.view(true)
    }

    /// The board as the opponent sees it.
    pub fn opponent_view(&self) -> BoardView {
        self.view(false)
    }

    fn view(&self, reveal: bool) -> BoardView {
        let mut cells = [[CellView::Unknown; N]; N];
        for at in Coord::all() {
            cells[at.row() as usize][at.col() as usize] = self.cell(at, reveal);
        }
        BoardView { cells }
    }

    /// What a shooter may use to pick its next target on this board.
    pub fn target_view(&self) -> TargetView {
        TargetView {
            hits: self.hits,
            misses: self.misses,
            remaining: self.remaining_ships(),
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("ships", &self.ships)
            .field("hits", &self.hits.len())
            .field("misses", &self.misses.len())
            .finish()
    }
}
