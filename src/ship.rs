//! Ship types, placements and placed ships.

use core::fmt;

use crate::common::ValidationError;
use crate::coord::{Coord, Orientation};
use crate::grid::CellSet;

/// The five kinds of ship in a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShipType {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipType {
    /// Fixed length in cells.
    pub const fn length(self) -> usize {
        match self {
            ShipType::Carrier => 5,
            ShipType::Battleship => 4,
            ShipType::Cruiser | ShipType::Submarine => 3,
            ShipType::Destroyer => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShipType::Carrier => "Carrier",
            ShipType::Battleship => "Battleship",
            ShipType::Cruiser => "Cruiser",
            ShipType::Submarine => "Submarine",
            ShipType::Destroyer => "Destroyer",
        }
    }

    /// Position in [`crate::FLEET`].
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a proposed fleet: which ship goes where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShipPlacement {
    pub ship_type: ShipType,
    pub anchor: Coord,
    pub orientation: Orientation,
}

impl ShipPlacement {
    pub const fn new(ship_type: ShipType, anchor: Coord, orientation: Orientation) -> Self {
        Self {
            ship_type,
            anchor,
            orientation,
        }
    }

    /// Cells covered by the ship, starting at the anchor.
    pub fn cells(&self) -> Result<Vec<Coord>, ValidationError> {
        let (dr, dc) = self.orientation.delta();
        (0..self.ship_type.length() as u8)
            .map(|k| {
                self.anchor
                    .step(dr, dc, k)
                    .ok_or(ValidationError::OutOfBounds {
                        ship: self.ship_type,
                        anchor: self.anchor,
                        orientation: self.orientation,
                    })
            })
            .collect()
    }
}

/// A ship placed on a board, tracking which of its cells have been hit.
#[derive(Clone, PartialEq, Eq)]
pub struct Ship {
    placement: ShipPlacement,
    cells: Vec<Coord>,
    mask: CellSet,
    hits: CellSet,
}

impl Ship {
    /// Lays out a ship; fails only when it would leave the board.
    pub fn new(placement: ShipPlacement) -> Result<Self, ValidationError> {
        let cells = placement.cells()?;
        let mask = cells.iter().copied().collect();
        Ok(Ship {
            placement,
            cells,
            mask,
            hits: CellSet::new(),
        })
    }

    pub fn ship_type(&self) -> ShipType {
        self.placement.ship_type
    }

    pub fn placement(&self) -> ShipPlacement {
        self.placement
    }

    /// Occupied cells in order from the anchor.
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    pub fn mask(&self) -> CellSet {
        self.mask
    }

    pub fn hits(&self) -> CellSet {
        self.hits
    }

    pub fn occupies(&self, at: Coord) -> bool {
        self.mask.contains(at)
    }

    /// Marks `at` as hit. Returns `true` if the cell belongs to this ship.
    pub(crate) fn register_hit(&mut self, at: Coord) -> bool {
        if self.occupies(at) {
            self.hits.insert(at);
            true
        } else {
            false
        }
    }

    pub fn is_sunk(&self) -> bool {
        self.hits == self.mask
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ type: {}, anchor: {}, orientation: {:?}, hits: {}/{} }}",
            self.placement.ship_type,
            self.placement.anchor,
            self.placement.orientation,
            self.hits.len(),
            self.cells.len(),
        )
    }
}
