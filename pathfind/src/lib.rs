//! A* search over randomly generated grid mazes.
//!
//! [`maze::generate`] builds a [`Grid`], the user picks a start and an end
//! with [`Grid::set_start`] and [`Grid::set_end`], and [`Grid::search`] or a
//! stepped [`SearchSession`] finds the shortest path while projecting its
//! progress onto the cell flags.

pub mod error;
pub mod find;
pub mod grid;
pub mod maze;
pub mod session;
pub mod settings;
pub mod util;

pub use error::{MazeError, SearchError, SelectionError};
pub use find::{
    Cost, MapStorage, MapTrait, NodeReference, NodeScore, PathFinder, PathFinderState,
    PathResult, SearchObserver,
};
pub use grid::{manhattan, Cell, CellStorage, CellView, Grid, NeighborTable, Point};
pub use session::SearchSession;
pub use settings::Settings;
