use crate::error::{MazeError, SelectionError};
use crate::find::{Cost, MapStorage, MapTrait, NodeReference, SearchObserver};
use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Weak},
};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl NodeReference for Point {}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Parses `row,col`
impl FromStr for Point {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Invalid point, expected row,col: {}", s))?;
        Ok(Point {
            row: row.trim().parse()?,
            col: col.trim().parse()?,
        })
    }
}

/// Manhattan distance, the exact cost of an unobstructed 4-directional walk
pub fn manhattan(a: Point, b: Point) -> Cost {
    a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
}

/// One square of the grid.
///
/// Only `walkable` is fixed at construction. The selection flags are driven by
/// [`Grid::set_start`]/[`Grid::set_end`] and the search flags by a running
/// search; none of them can be set on a blocked cell.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Cell {
    walkable: bool,
    is_start: bool,
    is_end: bool,
    in_frontier: bool,
    visited: bool,
    on_shortest_path: bool,
}

impl Cell {
    pub fn open() -> Self {
        Self {
            walkable: true,
            ..Default::default()
        }
    }

    pub fn blocked() -> Self {
        Self::default()
    }

    pub fn walkable(&self) -> bool {
        self.walkable
    }
    pub fn is_start(&self) -> bool {
        self.is_start
    }
    pub fn is_end(&self) -> bool {
        self.is_end
    }
    pub fn in_frontier(&self) -> bool {
        self.in_frontier
    }
    pub fn visited(&self) -> bool {
        self.visited
    }
    pub fn on_shortest_path(&self) -> bool {
        self.on_shortest_path
    }

    fn clear_search(&mut self) {
        self.in_frontier = false;
        self.visited = false;
        self.on_shortest_path = false;
    }

    /// How the cell should be presented when several flags are set
    pub fn view(&self) -> CellView {
        if !self.walkable {
            CellView::Blocked
        } else if self.is_start {
            CellView::Start
        } else if self.is_end {
            CellView::End
        } else if self.on_shortest_path {
            CellView::Path
        } else if self.in_frontier {
            CellView::Frontier
        } else if self.visited {
            CellView::Visited
        } else {
            CellView::Open
        }
    }
}

/// Display class of a cell, in decreasing precedence
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CellView {
    Blocked,
    Start,
    End,
    Path,
    Frontier,
    Visited,
    Open,
}

impl CellView {
    pub fn symbol(&self) -> char {
        match self {
            CellView::Blocked => 'X',
            CellView::Start => 'S',
            CellView::End => 'E',
            CellView::Path => '*',
            CellView::Frontier => '+',
            CellView::Visited => '-',
            CellView::Open => '.',
        }
    }
}

impl Display for CellView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A rectangular grid of cells with at most one start and one end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    columns: usize,
    // row-major
    cells: Vec<Cell>,
    start: Option<Point>,
    end: Option<Point>,
    pub(crate) guard: SearchGuard,
}

impl Grid {
    /// Builds a grid asking `walkable` about every cell in row-major order.
    pub fn from_fn(
        rows: usize,
        columns: usize,
        mut walkable: impl FnMut(Point) -> bool,
    ) -> Result<Self, MazeError> {
        if rows == 0 || columns == 0 {
            return Err(MazeError::EmptyDimensions { rows, columns });
        }

        let mut cells = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for col in 0..columns {
                cells.push(if walkable(Point { row, col }) {
                    Cell::open()
                } else {
                    Cell::blocked()
                });
            }
        }

        Ok(Self {
            rows,
            columns,
            cells,
            start: None,
            end: None,
            guard: SearchGuard::default(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_valid(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.columns
    }

    fn index(&self, point: Point) -> Option<usize> {
        self.is_valid(point)
            .then(|| point.row * self.columns + point.col)
    }

    pub fn cell(&self, point: Point) -> Option<&Cell> {
        self.index(point).map(|i| &self.cells[i])
    }

    /// Mutable access restricted to walkable cells, the only ones allowed to carry flags
    fn walkable_cell_mut(&mut self, point: Point) -> Option<&mut Cell> {
        let i = self.index(point)?;
        Some(&mut self.cells[i]).filter(|c| c.walkable)
    }

    pub fn view(&self, point: Point) -> Option<CellView> {
        self.cell(point).map(Cell::view)
    }

    /// All points in row-major order
    pub fn points(&self) -> impl Iterator<Item = Point> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |col| Point { row, col }))
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.walkable).count()
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn end(&self) -> Option<Point> {
        self.end
    }

    pub fn is_searching(&self) -> bool {
        self.guard.is_held()
    }

    fn check_selection(&self, point: Point, current: Option<Point>) -> Result<(), SelectionError> {
        let cell = self.cell(point).ok_or(SelectionError::OutOfBounds(point))?;
        if let Some(current) = current {
            return Err(SelectionError::AlreadySet(current));
        }
        if !cell.walkable {
            return Err(SelectionError::NotWalkable(point));
        }
        if cell.is_start || cell.is_end {
            return Err(SelectionError::Occupied(point));
        }
        Ok(())
    }

    /// Marks the start cell. The first accepted selection sticks until [`Grid::clear_selection`].
    pub fn set_start(&mut self, point: Point) -> Result<(), SelectionError> {
        self.check_selection(point, self.start)?;
        if let Some(cell) = self.walkable_cell_mut(point) {
            cell.is_start = true;
            self.start = Some(point);
        }
        Ok(())
    }

    /// Marks the end cell. The first accepted selection sticks until [`Grid::clear_selection`].
    pub fn set_end(&mut self, point: Point) -> Result<(), SelectionError> {
        self.check_selection(point, self.end)?;
        if let Some(cell) = self.walkable_cell_mut(point) {
            cell.is_end = true;
            self.end = Some(point);
        }
        Ok(())
    }

    /// Forgets start and end along with any search flags
    pub fn clear_selection(&mut self) {
        for cell in &mut self.cells {
            cell.is_start = false;
            cell.is_end = false;
            cell.clear_search();
        }
        self.start = None;
        self.end = None;
    }

    /// Resets the frontier, visited and path flags of every cell
    pub fn clear_search(&mut self) {
        for cell in &mut self.cells {
            cell.clear_search();
        }
    }

    /// The walkable 4-neighbors of `point`, ordered top, right, bottom, left.
    /// Empty for blocked or out of bounds points.
    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> {
        let mut points = Vec::with_capacity(4);

        if self.cell(point).is_some_and(|c| c.walkable) {
            if point.row > 0 {
                points.push(Point {
                    row: point.row - 1,
                    col: point.col,
                });
            }
            if point.col + 1 < self.columns {
                points.push(Point {
                    row: point.row,
                    col: point.col + 1,
                });
            }
            if point.row + 1 < self.rows {
                points.push(Point {
                    row: point.row + 1,
                    col: point.col,
                });
            }
            if point.col > 0 {
                points.push(Point {
                    row: point.row,
                    col: point.col - 1,
                });
            }

            // filter to only keep walkable cells
            points.retain(|p| self.cell(*p).is_some_and(|c| c.walkable));
        }

        points.into_iter()
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.columns) {
            for cell in row {
                write!(f, "{}", cell.view())?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Parses the layout written by `Display`: `X` or `#` is blocked, `.` is open,
/// `S` and `E` are open cells selected as start and end. Any search marks
/// (`*`, `+`, `-`) are read back as plain open cells.
impl FromStr for Grid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let rows = lines.len();
        let columns = lines.first().map_or(0, |l| l.chars().count());
        if let Some(line) = lines.iter().find(|l| l.chars().count() != columns) {
            return Err(anyhow::anyhow!(
                "Ragged grid, expected {} columns: {}",
                columns,
                line
            ));
        }

        let symbols: Vec<Vec<char>> = lines.iter().map(|l| l.chars().collect()).collect();
        for (row, line) in symbols.iter().enumerate() {
            if let Some(col) = line
                .iter()
                .position(|c| !matches!(c, 'X' | '#' | '.' | 'S' | 'E' | '*' | '+' | '-'))
            {
                return Err(anyhow::anyhow!(
                    "Invalid cell symbol {:?} at {}",
                    line[col],
                    Point { row, col }
                ));
            }
        }

        let mut grid = Grid::from_fn(rows, columns, |p| !matches!(symbols[p.row][p.col], 'X' | '#'))?;

        for point in grid.points().collect::<Vec<_>>() {
            match symbols[point.row][point.col] {
                'S' => grid.set_start(point)?,
                'E' => grid.set_end(point)?,
                _ => {}
            }
        }

        Ok(grid)
    }
}

/// Projects search progress onto the cell flags
impl SearchObserver<Point> for Grid {
    fn entered_frontier(&mut self, node: Point) {
        if let Some(cell) = self.walkable_cell_mut(node) {
            cell.in_frontier = true;
        }
    }

    fn left_frontier(&mut self, node: Point) {
        if let Some(cell) = self.walkable_cell_mut(node) {
            cell.in_frontier = false;
        }
    }

    fn closed(&mut self, node: Point) {
        if let Some(cell) = self.walkable_cell_mut(node) {
            cell.visited = true;
        }
    }

    fn on_path(&mut self, node: Point) {
        if let Some(cell) = self.walkable_cell_mut(node) {
            cell.on_shortest_path = true;
        }
    }
}

/// Links a grid to the one session allowed to search it.
///
/// The session owns the token and the grid keeps a weak handle, so a session
/// that is dropped early releases the grid on its own.
#[derive(Debug, Default)]
pub(crate) struct SearchGuard(Weak<()>);

impl SearchGuard {
    pub(crate) fn is_held(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn is_held_by(&self, token: &Arc<()>) -> bool {
        Weak::ptr_eq(&self.0, &Arc::downgrade(token))
    }

    pub(crate) fn acquire(&mut self) -> Arc<()> {
        let token = Arc::new(());
        self.0 = Arc::downgrade(&token);
        token
    }

    pub(crate) fn release(&mut self) {
        self.0 = Weak::new();
    }
}

// a cloned grid is not bound to the session of the original
impl Clone for SearchGuard {
    fn clone(&self) -> Self {
        Self::default()
    }
}

// grids compare by their cells only
impl PartialEq for SearchGuard {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for SearchGuard {}

/// A MapStorage backed by one row-major vec
#[derive(Debug, Clone)]
pub struct CellStorage<T> {
    rows: usize,
    columns: usize,
    values: Vec<T>,
}

impl<T: Default + Clone> CellStorage<T> {
    fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            values: vec![T::default(); rows * columns],
        }
    }
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Point;

    fn is_valid(&self, node: Self::Reference) -> bool {
        node.row < self.rows && node.col < self.columns
    }

    fn get(&self, node: Self::Reference) -> T {
        debug_assert!(self.is_valid(node), "{} is outside the storage", node);
        self.values[node.row * self.columns + node.col]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        debug_assert!(self.is_valid(node), "{} is outside the storage", node);
        &mut self.values[node.row * self.columns + node.col]
    }
}

impl<T: Display> Display for CellStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.values.chunks(self.columns) {
            for value in row {
                write!(f, "{}", value)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Neighbors derived lazily, straight from the cells
impl MapTrait for Grid {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        Grid::is_valid(self, node)
    }

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference> {
        self.neighbors(node)
    }

    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> Cost {
        manhattan(from, to)
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage::new(self.rows, self.columns)
    }
}

/// Neighbor lists of every cell, computed once for one grid.
///
/// The table is a snapshot of the grid it was built from and has to be
/// rebuilt for every new maze.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    rows: usize,
    columns: usize,
    neighbors: Vec<Vec<Point>>,
}

impl NeighborTable {
    pub fn new(grid: &Grid) -> Self {
        Self {
            rows: grid.rows,
            columns: grid.columns,
            neighbors: grid.points().map(|p| grid.neighbors(p).collect()).collect(),
        }
    }

    pub fn get(&self, point: Point) -> &[Point] {
        if point.row < self.rows && point.col < self.columns {
            &self.neighbors[point.row * self.columns + point.col]
        } else {
            &[]
        }
    }
}

impl MapTrait for NeighborTable {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        node.row < self.rows && node.col < self.columns
    }

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference> {
        self.get(node).iter().copied()
    }

    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> Cost {
        manhattan(from, to)
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage::new(self.rows, self.columns)
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::find::{PathFinder, PathFinderState, PathResult};

    fn create_basic_map() -> Grid {
        "
        XXXXXXX
        X.XXX.X
        X.XXX.X
        X.X...X
        X.X.XXX
        X......
        XXXXXXX
        "
        .parse()
        .unwrap()
    }

    fn open_grid(rows: usize, columns: usize) -> Grid {
        Grid::from_fn(rows, columns, |_| true).unwrap()
    }

    #[test]
    fn test_basic_route() {
        let map = create_basic_map();

        let finder = PathFinder::new(Point::new(1, 1), Point::new(1, 5), &map);

        // test the basic case
        assert!(matches!(
            finder.finish(&map, &mut ()).0,
            PathFinderState::PathFound(PathResult { total_cost: 12, .. })
        ));
    }

    #[test]
    fn test_basic_no_route() {
        let map = create_basic_map();

        let finder = PathFinder::new(Point::new(1, 1), Point::new(0, 5), &map);
        // no route to target
        assert!(matches!(
            finder.finish(&map, &mut ()).0,
            PathFinderState::NoPathFound
        ));
    }

    #[test]
    fn test_basic_shortcut() {
        let map: Grid = "
            XXXXXXX
            X.XXX.X
            X.XXX.X
            X.....X
            X.X.XXX
            X......
            XXXXXXX
        "
        .parse()
        .unwrap();

        let finder = PathFinder::new(Point::new(1, 1), Point::new(1, 5), &map);

        assert!(matches!(
            finder.finish(&map, &mut ()).0,
            PathFinderState::PathFound(PathResult { total_cost: 8, .. })
        ));
    }

    #[test]
    fn neighbors_are_ordered_top_right_bottom_left() {
        let grid = open_grid(3, 3);
        let neighbors: Vec<_> = grid.neighbors(Point::new(1, 1)).collect();
        assert_eq!(
            neighbors,
            vec![
                Point::new(0, 1),
                Point::new(1, 2),
                Point::new(2, 1),
                Point::new(1, 0)
            ]
        );
    }

    #[test]
    fn neighbors_skip_edges_and_blocked_cells() {
        let grid: Grid = "
            .X.
            ...
        "
        .parse()
        .unwrap();

        assert_eq!(
            grid.neighbors(Point::new(0, 0)).collect::<Vec<_>>(),
            vec![Point::new(1, 0)]
        );
        assert_eq!(
            grid.neighbors(Point::new(1, 1)).collect::<Vec<_>>(),
            vec![Point::new(1, 2), Point::new(1, 0)]
        );
        // blocked and out of bounds cells have no neighbors
        assert_eq!(grid.neighbors(Point::new(0, 1)).count(), 0);
        assert_eq!(grid.neighbors(Point::new(5, 5)).count(), 0);
    }

    #[test]
    fn neighbor_table_matches_lazy_neighbors() {
        let grid = create_basic_map();
        let table = NeighborTable::new(&grid);

        for point in grid.points() {
            let lazy: Vec<_> = grid.neighbors(point).collect();
            assert_eq!(table.get(point), lazy.as_slice());
        }
        assert!(table.get(Point::new(7, 0)).is_empty());
    }

    #[test]
    fn heuristic_is_zero_on_self_and_symmetric() {
        let a = Point::new(3, 9);
        let b = Point::new(7, 2);
        assert_eq!(manhattan(a, a), 0);
        assert_eq!(manhattan(a, b), manhattan(b, a));
        assert_eq!(manhattan(a, b), 11);
    }

    #[test]
    fn single_cell_cannot_be_both_start_and_end() {
        let mut grid = open_grid(1, 1);
        let only = Point::new(0, 0);

        assert_eq!(grid.set_start(only), Ok(()));
        assert_eq!(grid.set_end(only), Err(SelectionError::Occupied(only)));
        assert_eq!(grid.end(), None);
        assert!(!grid.cell(only).unwrap().is_end());
    }

    #[test]
    fn first_selection_wins() {
        let mut grid = open_grid(2, 2);

        grid.set_start(Point::new(0, 0)).unwrap();
        assert_eq!(
            grid.set_start(Point::new(1, 1)),
            Err(SelectionError::AlreadySet(Point::new(0, 0)))
        );
        assert_eq!(grid.start(), Some(Point::new(0, 0)));
        assert!(!grid.cell(Point::new(1, 1)).unwrap().is_start());

        grid.set_end(Point::new(1, 1)).unwrap();
        assert_eq!(
            grid.set_end(Point::new(1, 0)),
            Err(SelectionError::AlreadySet(Point::new(1, 1)))
        );

        grid.clear_selection();
        assert_eq!(grid.start(), None);
        assert_eq!(grid.end(), None);
        grid.set_start(Point::new(1, 1)).unwrap();
        assert_eq!(grid.start(), Some(Point::new(1, 1)));
    }

    #[test]
    fn blocked_and_out_of_bounds_selections_are_rejected() {
        let mut grid: Grid = "X.".parse().unwrap();
        let before = grid.clone();

        assert_eq!(
            grid.set_start(Point::new(0, 0)),
            Err(SelectionError::NotWalkable(Point::new(0, 0)))
        );
        assert_eq!(
            grid.set_end(Point::new(0, 2)),
            Err(SelectionError::OutOfBounds(Point::new(0, 2)))
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn parse_and_display_agree() {
        let text = "S.X\n.XE\n";
        let grid: Grid = text.parse().unwrap();

        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.start(), Some(Point::new(0, 0)));
        assert_eq!(grid.end(), Some(Point::new(1, 2)));
        assert_eq!(grid.walkable_count(), 4);
        assert_eq!(grid.to_string(), text);
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        assert!("..\n.".parse::<Grid>().is_err());
        assert!(".?.".parse::<Grid>().is_err());
        assert!("".parse::<Grid>().is_err());
        assert!("SS".parse::<Grid>().is_err());
    }

    #[test]
    fn point_parses_from_row_col() {
        assert_eq!("3,4".parse::<Point>().unwrap(), Point::new(3, 4));
        assert_eq!(" 0 , 12 ".parse::<Point>().unwrap(), Point::new(0, 12));
        assert!("3;4".parse::<Point>().is_err());
        assert!("a,1".parse::<Point>().is_err());
    }

    #[test]
    fn view_precedence() {
        let mut grid = open_grid(1, 3);
        grid.set_start(Point::new(0, 0)).unwrap();

        grid.entered_frontier(Point::new(0, 1));
        assert_eq!(grid.view(Point::new(0, 1)), Some(CellView::Frontier));
        grid.closed(Point::new(0, 1));
        assert_eq!(grid.view(Point::new(0, 1)), Some(CellView::Frontier));
        grid.left_frontier(Point::new(0, 1));
        assert_eq!(grid.view(Point::new(0, 1)), Some(CellView::Visited));
        grid.on_path(Point::new(0, 1));
        assert_eq!(grid.view(Point::new(0, 1)), Some(CellView::Path));

        // start and end win over search marks
        grid.closed(Point::new(0, 0));
        assert_eq!(grid.view(Point::new(0, 0)), Some(CellView::Start));
        assert_eq!(grid.view(Point::new(0, 2)), Some(CellView::Open));
    }

    #[test]
    fn blocked_cells_never_carry_flags() {
        let mut grid: Grid = ".X".parse().unwrap();
        let blocked = Point::new(0, 1);

        grid.entered_frontier(blocked);
        grid.closed(blocked);
        grid.on_path(blocked);

        assert_eq!(grid.cell(blocked), Some(&Cell::blocked()));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside the storage")]
    fn storage_rejects_points_past_the_row_end() {
        let grid = Grid::from_fn(2, 3, |_| true).unwrap();
        let storage = grid.create_storage::<usize>();

        // would silently land on (1, 1) without the bounds check
        storage.get(Point::new(0, 4));
    }

    #[test]
    fn clones_are_not_bound_to_a_session() {
        let mut grid: Grid = "S.E".parse().unwrap();
        let _session = grid.begin_search().unwrap();

        let copy = grid.clone();
        assert!(grid.is_searching());
        assert!(!copy.is_searching());
        assert_eq!(copy, grid);
    }
}
