use crate::tile::Tile;

/// All overlays share one draw order; tiles are not meant to occlude each
/// other.
pub const DRAW_ORDER: u32 = 30;

#[derive(Debug)]
struct GroundOverlay {
    name: String,
    href: String,
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

/// Accumulates one GroundOverlay per tile, in grid order, and renders the
/// KML index document a Garmin device expects to find inside the KMZ.
#[derive(Debug)]
pub struct KmlBuilder {
    document_name: String,
    overlays: Vec<GroundOverlay>,
}

impl KmlBuilder {
    pub fn new(document_name: &str) -> Self {
        KmlBuilder {
            document_name: document_name.to_string(),
            overlays: Vec::new(),
        }
    }

    /// Record the placement of one written tile image. Must be called in
    /// grid order; the document lists overlays in insertion order.
    pub fn add_overlay(&mut self, tile: &Tile, href: &str) {
        self.overlays.push(GroundOverlay {
            name: format!("Tile {}", tile.index),
            href: href.to_string(),
            north: tile.bounds.ymax,
            south: tile.bounds.ymin,
            east: tile.bounds.xmax,
            west: tile.bounds.xmin,
        });
    }

    /// Render the finished document. Valid (if useless) with zero
    /// overlays.
    pub fn finish(self) -> String {
        let mut kml = String::new();
        kml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        kml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
        kml.push_str("  <Document>\n");
        kml.push_str(&format!("    <name>{}</name>\n", self.document_name));

        for overlay in &self.overlays {
            kml.push_str("    <GroundOverlay>\n");
            kml.push_str(&format!("      <name>{}</name>\n", overlay.name));
            kml.push_str(&format!("      <drawOrder>{}</drawOrder>\n", DRAW_ORDER));
            kml.push_str(&format!(
                "      <Icon><href>{}</href></Icon>\n",
                overlay.href
            ));
            kml.push_str("      <LatLonBox>\n");
            kml.push_str(&format!(
                "        <north>{}</north><south>{}</south>\n",
                overlay.north, overlay.south
            ));
            kml.push_str(&format!(
                "        <east>{}</east><west>{}</west>\n",
                overlay.east, overlay.west
            ));
            kml.push_str("      </LatLonBox>\n");
            kml.push_str("    </GroundOverlay>\n");
        }

        kml.push_str("  </Document>\n");
        kml.push_str("</kml>\n");
        kml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileBounds;

    fn tile(index: usize, xmin: f64, ymin: f64) -> Tile {
        Tile {
            index,
            bounds: TileBounds::new(xmin, ymin, xmin + 0.5, ymin + 0.5).unwrap(),
        }
    }

    #[test]
    fn test_empty_document_is_well_formed() {
        let kml = KmlBuilder::new("custom-map").finish();

        assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(kml.contains("<name>custom-map</name>"));
        assert!(kml.ends_with("</kml>\n"));
        assert!(!kml.contains("<GroundOverlay>"));
    }

    #[test]
    fn test_overlays_are_rendered_in_insertion_order() {
        let mut builder = KmlBuilder::new("custom-map");
        builder.add_overlay(&tile(0, -67.0, 70.0), "tiles/tile-0.jpg");
        builder.add_overlay(&tile(1, -66.5, 70.0), "tiles/tile-1.jpg");
        builder.add_overlay(&tile(2, -66.0, 70.0), "tiles/tile-2.jpg");

        let kml = builder.finish();

        assert_eq!(kml.matches("<GroundOverlay>").count(), 3);
        let first = kml.find("<name>Tile 0</name>").unwrap();
        let second = kml.find("<name>Tile 1</name>").unwrap();
        let third = kml.find("<name>Tile 2</name>").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_overlay_geometry_comes_from_tile_bounds() {
        let mut builder = KmlBuilder::new("custom-map");
        builder.add_overlay(&tile(0, -67.0, 70.0), "tiles/tile-0.jpg");

        let kml = builder.finish();

        assert!(kml.contains("<north>70.5</north><south>70</south>"));
        assert!(kml.contains("<east>-66.5</east><west>-67</west>"));
        assert!(kml.contains("<drawOrder>30</drawOrder>"));
        assert!(kml.contains("<Icon><href>tiles/tile-0.jpg</href></Icon>"));
    }
}
