//! Board coordinates and ship orientations.
//!
//! Rows are lettered `A`..`J` and columns numbered `1`..`10`, so the textual
//! form of the top-left cell is `A1`. A [`Coord`] can only be built through
//! checked constructors and therefore always lies on the grid.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

use crate::config::BOARD_SIZE;

const N: u8 = BOARD_SIZE;

/// A cell on the 10×10 board. Ordering is row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawCoord", into = "RawCoord"))]
pub struct Coord {
    row: u8,
    col: u8,
}

/// Wire form of a [`Coord`]; decoding goes through [`Coord::new`].
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawCoord {
    row: u8,
    col: u8,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCoord> for Coord {
    type Error = CoordParseError;

    fn try_from(raw: RawCoord) -> Result<Self, Self::Error> {
        Coord::new(raw.row, raw.col).ok_or(CoordParseError::OffGrid {
            row: raw.row,
            col: raw.col,
        })
    }
}

#[cfg(feature = "serde")]
impl From<Coord> for RawCoord {
    fn from(c: Coord) -> Self {
        RawCoord { row: c.row, col: c.col }
    }
}

impl Coord {
    /// Returns `None` when either component is off the grid.
    pub const fn new(row: u8, col: u8) -> Option<Self> {
        if row < N && col < N {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Zero-based row (`A` is 0).
    pub const fn row(self) -> u8 {
        self.row
    }

    /// Zero-based column (`1` is 0).
    pub const fn col(self) -> u8 {
        self.col
    }

    /// Cell reached by moving `steps` times by (`dr`, `dc`), if still on the grid.
    pub fn step(self, dr: i8, dc: i8, steps: u8) -> Option<Self> {
        let r = self.row as i16 + dr as i16 * steps as i16;
        let c = self.col as i16 + dc as i16 * steps as i16;
        if (0..N as i16).contains(&r) && (0..N as i16).contains(&c) {
            Some(Self {
                row: r as u8,
                col: c as u8,
            })
        } else {
            None
        }
    }

    /// Chebyshev (king-move) distance between two cells.
    pub fn chebyshev(self, other: Coord) -> u8 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    /// The up to eight on-grid cells touching this one, diagonals included.
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        (-1i8..=1)
            .flat_map(|dr| (-1i8..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .filter_map(move |(dr, dc)| self.step(dr, dc, 1))
    }

    /// Every cell of the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..N).flat_map(|row| (0..N).map(move |col| Coord { row, col }))
    }

    pub(crate) const fn index(self) -> usize {
        self.row as usize * N as usize + self.col as usize
    }

    pub(crate) const fn from_index(idx: usize) -> Self {
        Coord {
            row: (idx / N as usize) as u8,
            col: (idx % N as usize) as u8,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.row) as char, self.col + 1)
    }
}

/// Errors produced while parsing coordinates or orientations from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordParseError {
    #[error("empty input")]
    Empty,
    #[error("row '{0}' must be a letter A-J")]
    BadRow(char),
    #[error("column '{0}' must be a number 1-10")]
    BadColumn(String),
    #[error("orientation '{0}' must be H, V or D")]
    BadOrientation(String),
    #[error("row {row}, column {col} is off the board")]
    OffGrid { row: u8, col: u8 },
}

impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let row_ch = chars
            .next()
            .ok_or(CoordParseError::Empty)?
            .to_ascii_uppercase();
        if !row_ch.is_ascii_uppercase() || (row_ch as u8 - b'A') >= N {
            return Err(CoordParseError::BadRow(row_ch));
        }
        let rest = chars.as_str();
        let col: u8 = rest
            .parse()
            .map_err(|_| CoordParseError::BadColumn(rest.to_string()))?;
        if col == 0 {
            return Err(CoordParseError::BadColumn(rest.to_string()));
        }
        Coord::new(row_ch as u8 - b'A', col - 1)
            .ok_or_else(|| CoordParseError::BadColumn(rest.to_string()))
    }
}

/// Direction a ship extends from its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Along a row, towards higher column numbers.
    Horizontal,
    /// Down a column, towards later row letters.
    Vertical,
    /// Down-right at 45°, one row and one column per cell.
    Diagonal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Horizontal,
        Orientation::Vertical,
        Orientation::Diagonal,
    ];

    /// Per-cell (row, column) step.
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Orientation::Horizontal => (0, 1),
            Orientation::Vertical => (1, 0),
            Orientation::Diagonal => (1, 1),
        }
    }
}

impl FromStr for Orientation {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" | "HORIZONTAL" => Ok(Orientation::Horizontal),
            "V" | "VERTICAL" => Ok(Orientation::Vertical),
            "D" | "DIAGONAL" => Ok(Orientation::Diagonal),
            other => Err(CoordParseError::BadOrientation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let c: Coord = "a1".parse().unwrap();
        assert_eq!(c, Coord::new(0, 0).unwrap());
        let c: Coord = "J10".parse().unwrap();
        assert_eq!((c.row(), c.col()), (9, 9));
        assert_eq!(c.to_string(), "J10");
        assert!("K1".parse::<Coord>().is_err());
        assert!("A11".parse::<Coord>().is_err());
        assert!("A0".parse::<Coord>().is_err());
        assert_eq!("".parse::<Coord>(), Err(CoordParseError::Empty));
    }

    #[test]
    fn corner_has_three_neighbors() {
        let corner = Coord::new(0, 0).unwrap();
        assert_eq!(corner.neighbors().count(), 3);
        let middle = Coord::new(4, 4).unwrap();
        assert_eq!(middle.neighbors().count(), 8);
        assert!(middle.neighbors().all(|n| n.chebyshev(middle) == 1));
    }

    #[test]
    fn step_stays_on_grid() {
        let c = Coord::new(8, 8).unwrap();
        assert_eq!(c.step(1, 1, 1), Coord::new(9, 9));
        assert_eq!(c.step(1, 1, 2), None);
        assert_eq!(c.step(-1, 0, 9), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn decoding_rejects_off_grid_cells() {
        let c: Coord = serde_json::from_str(r#"{"row":9,"col":3}"#).unwrap();
        assert_eq!(c, Coord::new(9, 3).unwrap());
        assert_eq!(serde_json::to_string(&c).unwrap(), r#"{"row":9,"col":3}"#);

        for json in [
            r#"{"row":12,"col":3}"#,
            r#"{"row":11,"col":0}"#,
            r#"{"row":25,"col":3}"#,
            r#"{"row":0,"col":10}"#,
        ] {
            let err = serde_json::from_str::<Coord>(json).unwrap_err();
            assert!(err.to_string().contains("off the board"), "{json}: {err}");
        }
    }
}
