/// Tiles wider than they are tall (or vice versa) by more than this are
/// rejected; Garmin custom maps expect square overlay images.
pub const SQUARE_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct TileBounds {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl TileBounds {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, String> {
        if xmax <= xmin || ymax <= ymin {
            return Err("Min values must be < max values".to_string());
        }

        let width = xmax - xmin;
        let height = ymax - ymin;
        if (width - height).abs() > SQUARE_TOLERANCE {
            return Err(format!(
                "Tile is not square (width {}, height {})",
                width, height
            ));
        }

        Ok(TileBounds {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }
}

/// One rectangular region to cut from the source raster. The index is
/// assigned once when the grid is loaded and names the archive entry and
/// the KML overlay for this tile.
#[derive(Debug, Clone)]
pub struct Tile {
    pub index: usize,
    pub bounds: TileBounds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_must_be_ordered() {
        assert!(TileBounds::new(-67.2, 70.9, -58.7, 79.4).is_ok());

        // xmax <= xmin
        let flipped_lon = TileBounds::new(10.0, 0.0, 0.0, 10.0);
        assert!(flipped_lon.is_err());

        // ymax <= ymin
        let flipped_lat = TileBounds::new(0.0, 10.0, 10.0, 0.0);
        assert!(flipped_lat.is_err());

        // Degenerate (zero-width) tile
        let degenerate = TileBounds::new(5.0, 0.0, 5.0, 10.0);
        assert!(degenerate.is_err());
    }

    #[test]
    fn test_bounds_must_be_near_square() {
        // 0.5 x 0.5 degrees, exactly square
        assert!(TileBounds::new(0.0, 0.0, 0.5, 0.5).is_ok());

        // Off by 0.0009, inside the tolerance
        assert!(TileBounds::new(0.0, 0.0, 0.5009, 0.5).is_ok());

        // Off by more than 0.001 in either direction
        assert!(TileBounds::new(0.0, 0.0, 0.502, 0.5).is_err());
        assert!(TileBounds::new(0.0, 0.0, 0.5, 0.502).is_err());
    }
}
