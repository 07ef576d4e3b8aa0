mod archive;
mod grid;
mod kml;
mod pipeline;
mod tile;
mod warp;

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;

use grid::Grid;
use pipeline::{Pipeline, TileFailurePolicy};
use warp::{GdalWarper, ResampleMethod};

#[derive(Parser)]
#[command(name = "garmin-kmz")]
#[command(about = "Make a Garmin KMZ custom map from a georeferenced raster", long_about = None)]
struct Args {
    /// CSV grid file with xmin,ymin,xmax,ymax tile extents
    #[arg(long)]
    grid: PathBuf,

    /// Georeferenced raster file to cut tiles from
    #[arg(long)]
    raster: PathBuf,

    /// Output KMZ file; its stem becomes the map name on the device
    #[arg(long, default_value = "custom-map.kmz")]
    output: PathBuf,

    /// Resampling algorithm used when warping tiles
    #[arg(long, value_enum, default_value = "lanczos")]
    resampling: ResampleMethod,

    /// Width and height of each tile image in pixels
    #[arg(long, default_value = "1024")]
    tile_size: usize,

    /// What to do when a single tile fails to resample
    #[arg(long, value_enum, default_value = "fail-fast")]
    on_tile_error: TileFailurePolicy,

    /// Delete an existing output archive before the run
    #[arg(long)]
    force: bool,
}

fn main() {
    let args = Args::parse();

    if args.force && args.output.exists() {
        if let Err(e) = fs::remove_file(&args.output) {
            eprintln!("Error: Could not remove {}: {}", args.output.display(), e);
            process::exit(1);
        }
    }

    let grid = match Grid::load(&args.grid) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let warper = match GdalWarper::open(&args.raster, args.resampling, args.tile_size) {
        Ok(warper) => warper,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let document_name = args
        .output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "custom-map".to_string());

    let pipeline = Pipeline::new(&warper)
        .document_name(&document_name)
        .policy(args.on_tile_error);

    match pipeline.run(&grid, &args.output) {
        Ok(summary) => {
            if summary.skipped > 0 {
                println!(
                    "Done, {} tiles written, {} skipped.",
                    summary.written, summary.skipped
                );
            } else {
                println!("Done!");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
