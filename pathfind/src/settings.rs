use std::path::Path;

use anyhow::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::MazeError;
use crate::grid::Grid;
use crate::maze::{self, DEFAULT_OPEN_PROBABILITY};

/// Everything needed to produce a maze and animate a search over it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct Settings {
    pub rows: usize,
    pub columns: usize,
    pub open_probability: f64,
    /// fixed seed for reproducible mazes, fresh entropy when absent
    pub seed: Option<u64>,
    /// search steps the frontend performs per frame
    pub steps_per_frame: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: 20,
            columns: 20,
            open_probability: DEFAULT_OPEN_PROBABILITY,
            seed: None,
            steps_per_frame: 1,
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), MazeError> {
        if self.rows == 0 || self.columns == 0 {
            return Err(MazeError::EmptyDimensions {
                rows: self.rows,
                columns: self.columns,
            });
        }
        if !(0.0..=1.0).contains(&self.open_probability) {
            return Err(MazeError::InvalidProbability(self.open_probability));
        }
        Ok(())
    }

    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    pub fn generate(&self) -> Result<Grid, MazeError> {
        maze::generate(
            self.rows,
            self.columns,
            self.open_probability,
            &mut self.rng(),
        )
    }
}
