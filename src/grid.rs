use serde::Deserialize;

use std::fmt;
use std::path::Path;

use crate::tile::{Tile, TileBounds};

/// Garmin devices refuse custom maps with more than 100 overlay images.
pub const MAX_TILES: usize = 100;

#[derive(Debug)]
pub enum GridError {
    Csv(csv::Error),
    Empty,
    TooManyTiles(usize),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Csv(e) => write!(f, "Failed to read grid file: {}", e),
            GridError::Empty => write!(f, "No usable tiles were found in the grid file"),
            GridError::TooManyTiles(n) => {
                write!(f, "Maximum of {} tiles supported, grid has {}", MAX_TILES, n)
            }
        }
    }
}

impl std::error::Error for GridError {}

impl From<csv::Error> for GridError {
    fn from(err: csv::Error) -> GridError {
        GridError::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct GridRow {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

/// The ordered set of tiles requested for one run. Order is the row order
/// of the grid file and determines archive entry naming and KML overlay
/// order.
#[derive(Debug)]
pub struct Grid {
    tiles: Vec<Tile>,
}

impl Grid {
    /// Load tiles from a CSV file with named columns xmin,ymin,xmax,ymax.
    ///
    /// Rows that cannot be parsed or that describe a non-square tile are
    /// skipped with a warning; they do not consume a tile index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Grid, GridError> {
        let mut reader = csv::Reader::from_path(path)?;

        let mut tiles = Vec::new();
        for (row, record) in reader.deserialize::<GridRow>().enumerate() {
            let parsed = match record {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Error in row {}: Could not parse. Skip!", row);
                    continue;
                }
            };

            match TileBounds::new(parsed.xmin, parsed.ymin, parsed.xmax, parsed.ymax) {
                Ok(bounds) => tiles.push(Tile {
                    index: tiles.len(),
                    bounds,
                }),
                Err(reason) => {
                    eprintln!("Error in row {}: {}. Skip!", row, reason);
                }
            }
        }

        if tiles.is_empty() {
            return Err(GridError::Empty);
        }

        if tiles.len() > MAX_TILES {
            return Err(GridError::TooManyTiles(tiles.len()));
        }

        Ok(Grid { tiles })
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}
