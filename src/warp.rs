use clap::ValueEnum;
use gdal::Dataset;
use gdal::cpl::CslStringList;

use std::ffi::{CString, c_int};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::tile::Tile;

/// Garmin custom maps are always positioned in geographic lon/lat,
/// regardless of the source raster's projection.
pub const TARGET_SRS: &str = "EPSG:4326";

#[derive(Debug)]
pub enum WarpError {
    SourceOpen(String),
    Resample { tile: usize, reason: String },
}

impl fmt::Display for WarpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarpError::SourceOpen(reason) => {
                write!(f, "Could not open source raster: {}", reason)
            }
            WarpError::Resample { tile, reason } => {
                write!(f, "Failed to resample tile {}: {}", tile, reason)
            }
        }
    }
}

impl std::error::Error for WarpError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResampleMethod {
    Near,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
}

impl ResampleMethod {
    /// Algorithm name as understood by the GDAL warper.
    pub fn gdal_name(self) -> &'static str {
        match self {
            ResampleMethod::Near => "near",
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Cubic => "cubic",
            ResampleMethod::CubicSpline => "cubicspline",
            ResampleMethod::Lanczos => "lanczos",
            ResampleMethod::Average => "average",
        }
    }
}

/// One resampled tile, already encoded as JPEG.
#[derive(Debug)]
pub struct TileImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

pub trait TileWarper {
    fn warp_tile(&self, tile: &Tile) -> Result<TileImage, WarpError>;
}

/// Warps tiles out of a GDAL dataset that is opened once and shared
/// read-only across all tiles.
pub struct GdalWarper {
    dataset: Dataset,
    resampling: ResampleMethod,
    tile_size: usize,
    scratch: tempfile::TempDir,
}

impl GdalWarper {
    pub fn open<P: AsRef<Path>>(
        raster: P,
        resampling: ResampleMethod,
        tile_size: usize,
    ) -> Result<Self, WarpError> {
        // The JPEG driver writes .aux.xml sidecar files unless PAM is off.
        gdal::config::set_config_option("GDAL_PAM_ENABLED", "NO")
            .map_err(|e| WarpError::SourceOpen(format!("Failed to configure GDAL: {}", e)))?;

        let dataset = Dataset::open(raster.as_ref()).map_err(|e| {
            WarpError::SourceOpen(format!("{}: {}", raster.as_ref().display(), e))
        })?;

        let scratch = tempfile::tempdir()
            .map_err(|e| WarpError::SourceOpen(format!("Failed to create scratch dir: {}", e)))?;

        Ok(GdalWarper {
            dataset,
            resampling,
            tile_size,
            scratch,
        })
    }

    // Warping each tile individually and then translating to JPEG gives
    // better output than warping the whole raster up front and cutting
    // JPEGs out of it, and keeps memory bounded by one tile.
    fn warp_to_vrt(&self, tile: &Tile) -> Result<Dataset, WarpError> {
        let resample_err = |reason: String| WarpError::Resample {
            tile: tile.index,
            reason,
        };

        let bounds = &tile.bounds;
        let size = self.tile_size.to_string();
        let args = [
            "-of".to_string(),
            "VRT".to_string(),
            "-t_srs".to_string(),
            TARGET_SRS.to_string(),
            "-te".to_string(),
            bounds.xmin.to_string(),
            bounds.ymin.to_string(),
            bounds.xmax.to_string(),
            bounds.ymax.to_string(),
            "-ts".to_string(),
            size.clone(),
            size,
            "-r".to_string(),
            self.resampling.gdal_name().to_string(),
        ];

        let mut options = CslStringList::new();
        for arg in &args {
            options
                .add_string(arg)
                .map_err(|e| resample_err(format!("Invalid warp option {}: {}", arg, e)))?;
        }

        unsafe {
            let app_options =
                gdal_sys::GDALWarpAppOptionsNew(options.as_ptr(), std::ptr::null_mut());
            if app_options.is_null() {
                return Err(resample_err("Could not build warp options".to_string()));
            }

            // Empty destination name plus -of VRT keeps the warp in memory.
            let dest = CString::new("")
                .map_err(|e| resample_err(format!("Invalid destination name: {}", e)))?;

            let mut usage_error: c_int = 0;
            let handle = gdal_sys::GDALWarp(
                dest.as_ptr(),
                std::ptr::null_mut(),
                1,
                &mut self.dataset.c_dataset(),
                app_options,
                &mut usage_error,
            );
            gdal_sys::GDALWarpAppOptionsFree(app_options);

            if handle.is_null() || usage_error != 0 {
                return Err(resample_err("Reprojection produced no result".to_string()));
            }

            Ok(Dataset::from_c_dataset(handle))
        }
    }

    fn translate_to_jpeg(
        &self,
        warped: &Dataset,
        dest: &Path,
        tile_index: usize,
    ) -> Result<Dataset, WarpError> {
        let resample_err = |reason: String| WarpError::Resample {
            tile: tile_index,
            reason,
        };

        let mut options = CslStringList::new();
        for arg in ["-of", "JPEG"] {
            options
                .add_string(arg)
                .map_err(|e| resample_err(format!("Invalid translate option {}: {}", arg, e)))?;
        }

        unsafe {
            let translate_options =
                gdal_sys::GDALTranslateOptionsNew(options.as_ptr(), std::ptr::null_mut());
            if translate_options.is_null() {
                return Err(resample_err("Could not build translate options".to_string()));
            }

            let dest_c = CString::new(dest.to_string_lossy().as_ref())
                .map_err(|e| resample_err(format!("Invalid destination path: {}", e)))?;

            let mut usage_error: c_int = 0;
            let handle = gdal_sys::GDALTranslate(
                dest_c.as_ptr(),
                warped.c_dataset(),
                translate_options,
                &mut usage_error,
            );
            gdal_sys::GDALTranslateOptionsFree(translate_options);

            if handle.is_null() || usage_error != 0 {
                return Err(resample_err("JPEG encoding failed".to_string()));
            }

            Ok(Dataset::from_c_dataset(handle))
        }
    }
}

impl TileWarper for GdalWarper {
    fn warp_tile(&self, tile: &Tile) -> Result<TileImage, WarpError> {
        let warped = self.warp_to_vrt(tile)?;

        let (width, height) = warped.raster_size();
        if width == 0 || height == 0 {
            return Err(WarpError::Resample {
                tile: tile.index,
                reason: "Reprojection produced an empty raster".to_string(),
            });
        }

        let jpeg_path = self.scratch.path().join(format!("tile-{}.jpg", tile.index));
        let translated = self.translate_to_jpeg(&warped, &jpeg_path, tile.index)?;
        // Closing the dataset flushes the JPEG to disk.
        drop(translated);

        let data = fs::read(&jpeg_path).map_err(|e| WarpError::Resample {
            tile: tile.index,
            reason: format!("Could not read encoded tile: {}", e),
        })?;
        let _ = fs::remove_file(&jpeg_path);

        if data.is_empty() {
            return Err(WarpError::Resample {
                tile: tile.index,
                reason: "JPEG encoding produced no data".to_string(),
            });
        }

        Ok(TileImage {
            data,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_method_gdal_names() {
        assert_eq!(ResampleMethod::Lanczos.gdal_name(), "lanczos");
        assert_eq!(ResampleMethod::Near.gdal_name(), "near");
        assert_eq!(ResampleMethod::CubicSpline.gdal_name(), "cubicspline");
    }

    #[test]
    fn test_resample_error_names_the_tile() {
        let err = WarpError::Resample {
            tile: 7,
            reason: "Reprojection produced no result".to_string(),
        };
        assert!(err.to_string().contains("tile 7"));
    }
}
