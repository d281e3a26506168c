use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use pathfind::{util::render_image, Grid, PathFinderState, Point, Settings};

/// Generate a random maze and search it for the shortest path
#[derive(Parser, Debug)]
#[command(name = "pathfind")]
#[command(about = "A* search over a random grid maze", long_about = None)]
struct Args {
    /// JSON settings file, overridden by the flags below
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    columns: Option<usize>,

    /// Chance of each cell being open
    #[arg(short = 'p', long)]
    open_probability: Option<f64>,

    /// Seed for a reproducible maze
    #[arg(short, long)]
    seed: Option<u64>,

    /// Start cell as row,col (defaults to the first open cell)
    #[arg(long)]
    start: Option<Point>,

    /// End cell as row,col (defaults to the last open cell)
    #[arg(long)]
    end: Option<Point>,

    /// Print the g score of every reached cell
    #[arg(long)]
    scores: bool,

    /// Write a PNG snapshot of the searched grid
    #[arg(long)]
    png: Option<PathBuf>,

    /// Pixels per cell in the PNG snapshot
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=256))]
    cell_size: u32,
}

impl Args {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        settings.rows = self.rows.unwrap_or(settings.rows);
        settings.columns = self.columns.unwrap_or(settings.columns);
        settings.open_probability = self.open_probability.unwrap_or(settings.open_probability);
        settings.seed = self.seed.or(settings.seed);
        settings.validate()?;
        Ok(settings)
    }
}

fn open_cells(grid: &Grid) -> Vec<Point> {
    grid.points()
        .filter(|&p| grid.cell(p).is_some_and(|c| c.walkable()))
        .collect()
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = Args::parse();
    let settings = args.settings()?;
    let mut grid = settings.generate()?;

    let open = open_cells(&grid);
    let start = args.start.or(open.first().copied());
    let end = args.end.or(open.last().copied());
    let (Some(start), Some(end)) = (start, end) else {
        warn!("the maze has no open cells");
        println!("{}", grid);
        return Ok(());
    };

    grid.set_start(start)
        .with_context(|| format!("cannot start at {}", start))?;
    grid.set_end(end)
        .with_context(|| format!("cannot end at {}", end))?;

    let mut session = grid.begin_search()?;
    let state = loop {
        let state = session.step(&mut grid)?;
        if state.is_done() {
            break state;
        }
    };

    println!("{}", grid);
    match &state {
        PathFinderState::PathFound(result) => {
            info!("path: {:?}", result.path);
            println!("Shortest path found: {} moves", result.total_cost);
        }
        _ => println!("Path not found"),
    }

    if args.scores {
        println!("{}", session.scores());
    }

    if let Some(path) = &args.png {
        render_image(&grid, args.cell_size)?
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
