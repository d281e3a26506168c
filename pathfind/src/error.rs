use thiserror::Error;

use crate::grid::Point;

/// Reasons a start or end selection is rejected. A rejected selection leaves the grid unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("cell {0} is outside the grid")]
    OutOfBounds(Point),
    #[error("cell {0} is blocked")]
    NotWalkable(Point),
    #[error("cell {0} is already selected for the other role")]
    Occupied(Point),
    #[error("selection already made at {0}")]
    AlreadySet(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MazeError {
    #[error("grid dimensions must be positive, got {rows}x{columns}")]
    EmptyDimensions { rows: usize, columns: usize },
    #[error("open probability must lie within [0, 1], got {0}")]
    InvalidProbability(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no start cell selected")]
    MissingStart,
    #[error("no end cell selected")]
    MissingEnd,
    #[error("a search is already running on this grid")]
    AlreadyRunning,
    #[error("the session was started on a different grid")]
    ForeignGrid,
}
