use log::debug;
use rand::Rng;

use crate::error::MazeError;
use crate::grid::Grid;

pub const DEFAULT_OPEN_PROBABILITY: f64 = 0.75;

/// Generates a maze where every cell is independently open with probability
/// `open_probability`.
///
/// Nothing guarantees that any two open cells are connected; a search on the
/// result may well find no path.
pub fn generate<R: Rng + ?Sized>(
    rows: usize,
    columns: usize,
    open_probability: f64,
    rng: &mut R,
) -> Result<Grid, MazeError> {
    if !(0.0..=1.0).contains(&open_probability) {
        return Err(MazeError::InvalidProbability(open_probability));
    }

    let grid = Grid::from_fn(rows, columns, |_| rng.gen_bool(open_probability))?;

    debug!(
        "generated {}x{} maze, {} of {} cells open",
        rows,
        columns,
        grid.walkable_count(),
        rows * columns
    );

    Ok(grid)
}
