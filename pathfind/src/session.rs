use std::sync::Arc;

use log::debug;

use crate::error::SearchError;
use crate::find::{Cost, NodeScore, PathFinder, PathFinderState};
use crate::grid::{CellStorage, Grid, NeighborTable, Point};

type GridFinder = PathFinder<Point, CellStorage<NodeScore<Point>>, NeighborTable>;

/// One A* run bound to a grid.
///
/// Created by [`Grid::begin_search`], which resets the search flags and
/// snapshots the neighbor lists. The grid refuses a second session while this
/// one is alive and unfinished. Dropping the session releases the grid.
/// Steps only project onto the grid the session was started on.
#[derive(Debug)]
pub struct SearchSession {
    neighbors: NeighborTable,
    finder: GridFinder,
    token: Arc<()>,
}

impl Grid {
    pub fn begin_search(&mut self) -> Result<SearchSession, SearchError> {
        if self.guard.is_held() {
            return Err(SearchError::AlreadyRunning);
        }
        let start = self.start().ok_or(SearchError::MissingStart)?;
        let end = self.end().ok_or(SearchError::MissingEnd)?;

        self.clear_search();
        let neighbors = NeighborTable::new(self);
        let finder = PathFinder::new(start, end, &neighbors);
        let token = self.guard.acquire();

        debug!("search started from {} to {}", start, end);
        Ok(SearchSession {
            neighbors,
            finder,
            token,
        })
    }

    /// Runs a whole search on the selected start and end
    pub fn search(&mut self) -> Result<PathFinderState<Point>, SearchError> {
        let session = self.begin_search()?;
        session.finish(self)
    }
}

impl SearchSession {
    /// Expands one cell. Once the search is done the outcome is returned
    /// again without touching any grid.
    pub fn step(&mut self, grid: &mut Grid) -> Result<PathFinderState<Point>, SearchError> {
        if self.finder.state().is_done() {
            return Ok(self.finder.state().clone());
        }
        if !grid.guard.is_held_by(&self.token) {
            return Err(SearchError::ForeignGrid);
        }

        let state = self.finder.step(&self.neighbors, grid);
        if state.is_done() {
            grid.guard.release();
        }
        Ok(state)
    }

    pub fn finish(mut self, grid: &mut Grid) -> Result<PathFinderState<Point>, SearchError> {
        loop {
            match self.step(grid)? {
                PathFinderState::Computing => {}
                s => return Ok(s),
            }
        }
    }

    /// Steps until the search ends or `should_stop` returns true, which is
    /// asked before every step. A stopped search is abandoned and reported
    /// as [`PathFinderState::Computing`].
    pub fn finish_until(
        mut self,
        grid: &mut Grid,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<PathFinderState<Point>, SearchError> {
        loop {
            if should_stop() {
                self.cancel();
                return Ok(PathFinderState::Computing);
            }
            match self.step(grid)? {
                PathFinderState::Computing => {}
                s => return Ok(s),
            }
        }
    }

    /// Abandons the search. Flags already projected stay as they are.
    pub fn cancel(self) {
        debug!("search cancelled after {} steps", self.finder.steps());
    }

    pub fn state(&self) -> &PathFinderState<Point> {
        self.finder.state()
    }

    pub fn g_score(&self, point: Point) -> Option<Cost> {
        self.finder.g_score(point)
    }

    pub fn f_score(&self, point: Point) -> Option<Cost> {
        self.finder.f_score(point)
    }

    pub fn predecessor(&self, point: Point) -> Option<Point> {
        self.finder.predecessor(point)
    }

    pub fn steps(&self) -> usize {
        self.finder.steps()
    }

    pub fn scores(&self) -> &CellStorage<NodeScore<Point>> {
        self.finder.scores()
    }

    pub fn start(&self) -> Point {
        self.finder.start()
    }

    pub fn goal(&self) -> Point {
        self.finder.goal()
    }
}
