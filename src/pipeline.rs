use clap::ValueEnum;

use std::fmt;
use std::path::Path;

use crate::archive::{ArchiveError, DOC_ENTRY, KmzArchive, tile_entry_name};
use crate::grid::{Grid, GridError};
use crate::kml::KmlBuilder;
use crate::warp::{TileWarper, WarpError};

#[derive(Debug)]
pub enum PipelineError {
    Grid(GridError),
    Warp(WarpError),
    Archive(ArchiveError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Grid(e) => write!(f, "{}", e),
            PipelineError::Warp(e) => write!(f, "{}", e),
            PipelineError::Archive(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<GridError> for PipelineError {
    fn from(err: GridError) -> PipelineError {
        PipelineError::Grid(err)
    }
}

impl From<WarpError> for PipelineError {
    fn from(err: WarpError) -> PipelineError {
        PipelineError::Warp(err)
    }
}

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> PipelineError {
        PipelineError::Archive(err)
    }
}

/// What to do when a single tile fails to resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TileFailurePolicy {
    /// Abort the whole run; a published map with a hole in it is worse
    /// than no map.
    FailFast,
    /// Warn, leave the tile out of the archive and the index, continue.
    BestEffort,
}

#[derive(Debug)]
pub struct RunSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Sequences one run: for each tile, resample, append the image to the
/// archive and the overlay to the index, then finalize the archive with
/// the index document. Tiles are processed strictly in grid order; the
/// overlay list and the archive entries stay in lockstep.
pub struct Pipeline<'a> {
    warper: &'a dyn TileWarper,
    document_name: String,
    policy: TileFailurePolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(warper: &'a dyn TileWarper) -> Self {
        Pipeline {
            warper,
            document_name: "custom-map".to_string(),
            policy: TileFailurePolicy::FailFast,
        }
    }

    pub fn document_name(mut self, name: &str) -> Self {
        self.document_name = name.to_string();
        self
    }

    pub fn policy(mut self, policy: TileFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(&self, grid: &Grid, output: &Path) -> Result<RunSummary, PipelineError> {
        let mut archive = KmzArchive::create(output)?;
        let mut kml = KmlBuilder::new(&self.document_name);
        let mut summary = RunSummary {
            written: 0,
            skipped: 0,
        };

        println!("Creating {} tiles inside {}...", grid.len(), output.display());

        for tile in grid.tiles() {
            let image = match self.warper.warp_tile(tile) {
                Ok(image) => image,
                Err(e) => match self.policy {
                    TileFailurePolicy::FailFast => return Err(e.into()),
                    TileFailurePolicy::BestEffort => {
                        eprintln!("✗ {}", e);
                        summary.skipped += 1;
                        continue;
                    }
                },
            };

            let entry = tile_entry_name(tile.index);
            archive.write_image(&entry, &image.data)?;
            kml.add_overlay(tile, &entry);
            summary.written += 1;
            println!("✓ {} ({}x{})", entry, image.width, image.height);
        }

        // The index goes in last so it never references an image that was
        // not written.
        archive.write_document(DOC_ENTRY, &kml.finish())?;
        archive.close()?;

        Ok(summary)
    }
}
