// Probability-based target selection for the scripted opponent.

use rand::Rng;

use crate::{
    board::TargetView,
    config::BOARD_SIZE,
    coord::{Coord, Orientation},
    ship::ShipPlacement,
};

pub const GRID_SIZE: usize = BOARD_SIZE as usize;

/// Placements covering more observed hits weigh this much more per hit, which
/// concentrates the density around damaged ships.
const HIT_BIAS: f64 = 10.0;

/// Probability density over unfired cells.
///
/// Every in-bounds placement of every remaining ship that avoids known misses
/// contributes weight to the unfired cells it covers.
pub fn calc_pdf(view: &TargetView) -> [[f64; GRID_SIZE]; GRID_SIZE] {
    let mut matrix = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    let fired = view.fired();

    for &ship in &view.remaining {
        for orientation in Orientation::ALL {
            for anchor in Coord::all() {
                let Ok(cells) = ShipPlacement::new(ship, anchor, orientation).cells() else {
                    continue;
                };
                if cells.iter().any(|c| view.misses.contains(*c)) {
                    continue;
                }
                let n_hits = cells.iter().filter(|c| view.hits.contains(**c)).count();
                let weight = HIT_BIAS.powi(n_hits as i32);
                for c in cells.iter().filter(|c| !fired.contains(**c)) {
                    matrix[c.row() as usize][c.col() as usize] += weight;
                }
            }
        }
    }

    normalize(matrix)
}

fn normalize(mut matrix: [[f64; GRID_SIZE]; GRID_SIZE]) -> [[f64; GRID_SIZE]; GRID_SIZE] {
    let total: f64 = matrix.iter().flatten().sum();
    if total == 0.0 {
        return matrix;
    }
    for v in matrix.iter_mut().flatten() {
        *v /= total;
    }
    matrix
}

/// Samples a cell from `pdf` after sharpening it with `temperature`.
///
/// Returns `None` when the density is empty everywhere.
pub fn sample_pdf<R: Rng + ?Sized>(
    pdf: &[[f64; GRID_SIZE]; GRID_SIZE],
    temperature: f64,
    rng: &mut R,
) -> Option<Coord> {
    let mut adjusted = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    let mut total = 0.0;
    for (r, row) in pdf.iter().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            let w = v.powf(1.0 / temperature);
            adjusted[r][c] = w;
            total += w;
        }
    }
    if total <= 0.0 {
        return None;
    }
    let threshold: f64 = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last = None;
    for at in Coord::all() {
        let w = adjusted[at.row() as usize][at.col() as usize];
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last = Some(at);
        if threshold < cumulative {
            return Some(at);
        }
    }
    last
}

/// Picks the next target: density sampling, falling back to a uniformly
/// random unfired cell. `None` only when every cell has been fired at.
pub fn choose_target<R: Rng + ?Sized>(view: &TargetView, rng: &mut R) -> Option<Coord> {
    let fired = view.fired();
    let pdf = calc_pdf(view);
    // Lower temperature biases sampling towards the likeliest cells.
    if let Some(at) = sample_pdf(&pdf, 0.5, rng) {
        if !fired.contains(at) {
            return Some(at);
        }
    }
    let open = !fired;
    let count = open.len();
    if count == 0 {
        return None;
    }
    open.iter().nth(rng.random_range(0..count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellSet;
    use crate::ship::ShipType;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn density_favours_cells_next_to_hits() {
        let hit = Coord::new(4, 4).unwrap();
        let view = TargetView {
            hits: [hit].into_iter().collect(),
            misses: CellSet::new(),
            remaining: vec![ShipType::Destroyer],
        };
        let pdf = calc_pdf(&view);
        assert_eq!(pdf[4][4], 0.0);
        assert!(pdf[4][5] > pdf[0][0] * 4.0);
    }

    #[test]
    fn never_picks_a_fired_cell() {
        let mut rng = SmallRng::seed_from_u64(7);
        let open = Coord::new(9, 9).unwrap();
        let mut misses = CellSet::full();
        misses.remove(open);
        let view = TargetView {
            hits: CellSet::new(),
            misses,
            remaining: vec![ShipType::Carrier],
        };
        assert_eq!(choose_target(&view, &mut rng), Some(open));
    }
}
