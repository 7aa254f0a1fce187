//! A fixed 10×10 set of cells packed into a `u128`.
//!
//! Bit `row * 10 + col` is set when the cell is a member. Set algebra is
//! exposed through the bitwise operators so fleet-wide checks read as one
//! expression (`a.halo() & b`).

use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use crate::config::BOARD_SIZE;
use crate::coord::Coord;

const CELLS: usize = BOARD_SIZE as usize * BOARD_SIZE as usize;

#[inline]
const fn mask() -> u128 {
    (1u128 << CELLS) - 1
}

/// Set of board cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "u128", into = "u128"))]
pub struct CellSet {
    bits: u128,
}

impl CellSet {
    /// Empty set.
    #[inline]
    pub const fn new() -> Self {
        CellSet { bits: 0 }
    }

    /// Set containing every cell of the board.
    #[inline]
    pub const fn full() -> Self {
        CellSet { bits: mask() }
    }

    /// Number of member cells.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn contains(&self, at: Coord) -> bool {
        (self.bits >> at.index()) & 1 == 1
    }

    /// Adds `at`; returns `false` if it was already a member.
    pub fn insert(&mut self, at: Coord) -> bool {
        let was = self.contains(at);
        self.bits |= 1u128 << at.index();
        !was
    }

    /// Removes `at`; returns `false` if it was not a member.
    pub fn remove(&mut self, at: Coord) -> bool {
        let was = self.contains(at);
        self.bits &= !(1u128 << at.index());
        was
    }

    pub fn intersects(&self, other: &CellSet) -> bool {
        self.bits & other.bits != 0
    }

    /// Lowest member in row-major order.
    pub fn first(&self) -> Option<Coord> {
        if self.bits == 0 {
            None
        } else {
            Some(Coord::from_index(self.bits.trailing_zeros() as usize))
        }
    }

    /// Members plus every cell within Chebyshev distance 1 of a member.
    ///
    /// Cells that would fall beyond the board edge simply do not exist.
    pub fn halo(&self) -> CellSet {
        let mut out = *self;
        for at in self.iter() {
            for n in at.neighbors() {
                out.insert(n);
            }
        }
        out
    }

    #[inline]
    pub fn into_raw(self) -> u128 {
        self.bits
    }

    /// Builds a set from raw bits, dropping anything beyond the 100 board cells.
    #[inline]
    pub fn from_raw(raw: u128) -> Self {
        CellSet { bits: raw & mask() }
    }

    /// Members in row-major order.
    #[inline]
    pub fn iter(&self) -> Cells {
        Cells {
            bits: self.bits,
        }
    }
}

impl From<u128> for CellSet {
    fn from(raw: u128) -> Self {
        CellSet::from_raw(raw)
    }
}

impl From<CellSet> for u128 {
    fn from(set: CellSet) -> Self {
        set.bits
    }
}

impl FromIterator<Coord> for CellSet {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        let mut set = CellSet::new();
        for at in iter {
            set.insert(at);
        }
        set
    }
}

impl fmt::Debug for CellSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CellSet ({} cells):", self.len())?;
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CellSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for at in Coord::all() {
            let ch = if self.contains(at) { '■' } else { '□' };
            write!(f, "{} ", ch)?;
            if at.col() + 1 == BOARD_SIZE && at.row() + 1 < BOARD_SIZE {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Iterator over the members of a [`CellSet`].
#[derive(Clone, Copy)]
pub struct Cells {
    bits: u128,
}

impl Iterator for Cells {
    type Item = Coord;

    #[inline]
    fn next(&mut self) -> Option<Coord> {
        if self.bits == 0 {
            return None;
        }
        let idx = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(Coord::from_index(idx))
    }
}

impl BitAnd for CellSet {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        CellSet {
            bits: self.bits & rhs.bits,
        }
    }
}

impl BitOr for CellSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        CellSet {
            bits: self.bits | rhs.bits,
        }
    }
}

/// Complement within the board.
impl Not for CellSet {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self::from_raw(!self.bits)
    }
}

impl BitAndAssign for CellSet {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.bits &= rhs.bits;
    }
}

impl BitOrAssign for CellSet {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}
