//! Fleet validation and random fleet generation.
//!
//! Validation is pure: it either returns a fully built [`Board`] or the first
//! rule the proposal breaks, and nothing is mutated on failure. Checks run in
//! a fixed order: composition, bounds, overlap, then spacing.

use log::debug;
use rand::Rng;

use crate::board::Board;
use crate::common::ValidationError;
use crate::config::{BOARD_SIZE, FLEET, NUM_SHIPS};
use crate::coord::{Coord, Orientation};
use crate::grid::CellSet;
use crate::ship::{Ship, ShipPlacement, ShipType};

/// Attempts per ship before a random layout is abandoned and restarted.
const PLACE_ATTEMPTS: usize = 100;
/// Whole-fleet restarts before falling back to [`standard_fleet`].
const FLEET_RESTARTS: usize = 64;

/// Validates a proposed fleet and builds the board it describes.
pub fn validate_and_create_board(fleet: &[ShipPlacement]) -> Result<Board, ValidationError> {
    let ships = validate_fleet(fleet)?;
    Ok(Board::from_ships(ships))
}

/// Validates a proposed fleet, returning its ships in the order given.
pub fn validate_fleet(fleet: &[ShipPlacement]) -> Result<Vec<Ship>, ValidationError> {
    check_composition(fleet)?;

    let ships = fleet
        .iter()
        .map(|p| Ship::new(*p))
        .collect::<Result<Vec<_>, _>>()?;

    for (i, a) in ships.iter().enumerate() {
        for b in &ships[i + 1..] {
            if let Some(at) = (a.mask() & b.mask()).first() {
                return Err(ValidationError::Overlap {
                    first: a.ship_type(),
                    second: b.ship_type(),
                    at,
                });
            }
        }
    }

    for (i, a) in ships.iter().enumerate() {
        let zone = a.mask().halo();
        for b in &ships[i + 1..] {
            if let Some(at) = (zone & b.mask()).first() {
                return Err(ValidationError::AdjacentShips {
                    first: a.ship_type(),
                    second: b.ship_type(),
                    at,
                });
            }
        }
    }

    Ok(ships)
}

fn check_composition(fleet: &[ShipPlacement]) -> Result<(), ValidationError> {
    let mut seen = [false; NUM_SHIPS];
    for p in fleet {
        let slot = &mut seen[p.ship_type.index()];
        if *slot {
            return Err(ValidationError::DuplicateShipType(p.ship_type));
        }
        *slot = true;
    }
    let missing: Vec<ShipType> = FLEET
        .iter()
        .copied()
        .filter(|t| !seen[t.index()])
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::WrongFleetComposition { missing })
    }
}

/// A fixed legal layout: every ship horizontal at column 1 on rows A, C, E, G, I.
pub fn standard_fleet() -> [ShipPlacement; NUM_SHIPS] {
    core::array::from_fn(|i| {
        let anchor = Coord::from_index(2 * i * BOARD_SIZE as usize);
        ShipPlacement::new(FLEET[i], anchor, Orientation::Horizontal)
    })
}

/// Generates a random legal fleet using all three orientations.
pub fn random_fleet<R: Rng + ?Sized>(rng: &mut R) -> Vec<ShipPlacement> {
    for _ in 0..FLEET_RESTARTS {
        if let Some(fleet) = try_random_fleet(rng) {
            return fleet;
        }
    }
    debug!("random fleet generation exhausted its restarts; using the standard layout");
    standard_fleet().to_vec()
}

/// Validated board holding a [`random_fleet`].
pub fn random_board<R: Rng + ?Sized>(rng: &mut R) -> Result<Board, ValidationError> {
    validate_and_create_board(&random_fleet(rng))
}

fn try_random_fleet<R: Rng + ?Sized>(rng: &mut R) -> Option<Vec<ShipPlacement>> {
    let mut blocked = CellSet::new();
    let mut fleet = Vec::with_capacity(NUM_SHIPS);
    for ship_type in FLEET {
        let placement = random_placement(rng, ship_type, &blocked)?;
        let ship = Ship::new(placement).ok()?;
        blocked |= ship.mask().halo();
        fleet.push(placement);
    }
    Some(fleet)
}

/// Picks an in-bounds placement whose cells avoid `blocked`.
fn random_placement<R: Rng + ?Sized>(
    rng: &mut R,
    ship_type: ShipType,
    blocked: &CellSet,
) -> Option<ShipPlacement> {
    let span = ship_type.length() as u8 - 1;
    for _ in 0..PLACE_ATTEMPTS {
        let orientation = Orientation::ALL[rng.random_range(0..Orientation::ALL.len())];
        let (dr, dc) = orientation.delta();
        let max_row = BOARD_SIZE - 1 - span * dr as u8;
        let max_col = BOARD_SIZE - 1 - span * dc as u8;
        let anchor = Coord::new(rng.random_range(0..=max_row), rng.random_range(0..=max_col))?;
        let placement = ShipPlacement::new(ship_type, anchor, orientation);
        let Ok(cells) = placement.cells() else {
            continue;
        };
        if cells.iter().all(|c| !blocked.contains(*c)) {
            return Some(placement);
        }
    }
    None
}
