// Map catalog: names, backing images and the geographic area each image covers

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};

use crate::errors::PitlaneError;

use super::{GeoBox, LOGICAL_H, LOGICAL_W, MapTile};

const CATALOG_COLUMNS: usize = 6;
/// Allowed relative deviation of a tile from the canvas aspect ratio
const ASPECT_TOLERANCE: f64 = 0.01;

/// Anything the projector can resolve a map name against
pub trait TileSource {
    fn lookup(&mut self, name: &str) -> Result<Arc<MapTile>, PitlaneError>;
}

/// One row of the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub filename: String,
    pub bounds: GeoBox,
}

/// Catalog of maps read from a `Name, Filename, Lat_1, Lon_1, Lat_2, Lon_2`
/// table, where (Lat_1, Lon_1) is the top-left corner and (Lat_2, Lon_2) the
/// bottom-right one. Images are decoded on first lookup and kept in memory.
pub struct MapCatalog {
    maps_dir: PathBuf,
    entries: Vec<CatalogEntry>,
    cache: HashMap<String, Arc<MapTile>>,
}

impl MapCatalog {
    /// Load a catalog file. Image filenames resolve relative to `maps_dir`.
    pub fn load(catalog_path: &Path, maps_dir: &Path) -> Result<Self, PitlaneError> {
        let text = fs::read_to_string(catalog_path)
            .map_err(|e| PitlaneError::CatalogIo { source: e })?;
        let catalog = Self::from_csv_str(&text, maps_dir)?;
        info!(
            "Loaded {} maps from catalog {:?}",
            catalog.len(),
            catalog_path
        );
        Ok(catalog)
    }

    /// Parse catalog text. The first row is a header and is always skipped.
    pub fn from_csv_str(text: &str, maps_dir: &Path) -> Result<Self, PitlaneError> {
        let mut entries: Vec<CatalogEntry> = Vec::new();

        for (index, row) in text.lines().enumerate().skip(1) {
            let line = index + 1;
            if row.trim().is_empty() {
                continue;
            }

            let fields = split_row(row).map_err(|reason| PitlaneError::CatalogParse {
                line,
                reason: reason.to_string(),
            })?;
            if fields.len() != CATALOG_COLUMNS {
                return Err(PitlaneError::CatalogParse {
                    line,
                    reason: format!(
                        "expected {} columns, found {}",
                        CATALOG_COLUMNS,
                        fields.len()
                    ),
                });
            }

            let name = fields[0].as_str();
            if name.is_empty() {
                return Err(PitlaneError::CatalogParse {
                    line,
                    reason: "map name is empty".to_string(),
                });
            }
            if entries.iter().any(|e| e.name == name) {
                return Err(PitlaneError::CatalogParse {
                    line,
                    reason: format!("duplicate map name '{}'", name),
                });
            }

            let coordinate = |column: usize| -> Result<f64, PitlaneError> {
                fields[column]
                    .parse::<f64>()
                    .map_err(|e| PitlaneError::CatalogParse {
                        line,
                        reason: format!("invalid coordinate '{}': {}", fields[column], e),
                    })
            };
            let bounds = GeoBox::new(
                name,
                coordinate(2)?,
                coordinate(3)?,
                coordinate(4)?,
                coordinate(5)?,
            )?;

            entries.push(CatalogEntry {
                name: name.to_string(),
                filename: fields[1].clone(),
                bounds,
            });
        }

        Ok(Self {
            maps_dir: maps_dir.to_path_buf(),
            entries,
            cache: HashMap::new(),
        })
    }

    /// Map names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    fn load_tile(&self, entry: &CatalogEntry) -> Result<MapTile, PitlaneError> {
        let path = self.maps_dir.join(&entry.filename);
        let image = image::open(&path)
            .map_err(|e| PitlaneError::MapLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?
            .into_rgba8();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PitlaneError::MapLoad {
                path,
                reason: "image is empty".to_string(),
            });
        }
        let expected = LOGICAL_W / LOGICAL_H;
        let aspect = width as f64 / height as f64;
        if ((aspect - expected) / expected).abs() > ASPECT_TOLERANCE {
            return Err(PitlaneError::MapLoad {
                path,
                reason: format!(
                    "{}x{} image does not have the required 8:5 aspect ratio",
                    width, height
                ),
            });
        }

        info!("Loaded map '{}' ({}x{}) from {:?}", entry.name, width, height, path);
        Ok(MapTile::new(image, entry.bounds))
    }
}

impl TileSource for MapCatalog {
    fn lookup(&mut self, name: &str) -> Result<Arc<MapTile>, PitlaneError> {
        if let Some(tile) = self.cache.get(name) {
            return Ok(Arc::clone(tile));
        }

        let entry = self.entry(name).ok_or_else(|| PitlaneError::UnknownMap {
            name: name.to_string(),
        })?;
        debug!("Map '{}' not cached, decoding {}", name, entry.filename);
        let tile = Arc::new(self.load_tile(entry)?);
        self.cache.insert(name.to_string(), Arc::clone(&tile));
        Ok(tile)
    }
}

/// Split one catalog row on commas. Fields may be wrapped in double quotes to
/// carry commas, with `""` standing for a literal quote. Unquoted fields are
/// trimmed, quoted ones are kept verbatim.
fn split_row(row: &str) -> Result<Vec<String>, &'static str> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if !quoted && field.trim().is_empty() => {
                field.clear();
                quoted = true;
                in_quotes = true;
            }
            ',' if !in_quotes => {
                fields.push(finish_field(&mut field, quoted));
                quoted = false;
            }
            // anything but blanks after the closing quote is malformed
            c if quoted && !in_quotes => {
                if !c.is_whitespace() {
                    return Err("unexpected text after closing quote");
                }
            }
            c => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field");
    }
    fields.push(finish_field(&mut field, quoted));
    Ok(fields)
}

fn finish_field(field: &mut String, quoted: bool) -> String {
    let taken = std::mem::take(field);
    if quoted {
        taken
    } else {
        taken.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    const CATALOG: &str = "Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2
Campus,campus.png,29.7200,-95.4050,29.7150,-95.3950

\"Test Track\", track.png , 10, 20, 0, 30
";

    #[test]
    fn test_parse_catalog() {
        let catalog = MapCatalog::from_csv_str(CATALOG, Path::new("maps")).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Campus", "Test Track"]);

        let track = catalog.entry("Test Track").unwrap();
        assert_eq!(track.filename, "track.png");
        assert_eq!(track.bounds.top_lat, 10.);
        assert_eq!(track.bounds.left_lon, 20.);
        assert_eq!(track.bounds.bottom_lat, 0.);
        assert_eq!(track.bounds.right_lon, 30.);
    }

    #[test]
    fn test_header_only_catalog_is_empty() {
        let catalog =
            MapCatalog::from_csv_str("Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2\n", Path::new("."))
                .unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_rows() {
        let header = "Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2\n";

        let missing_column = format!("{header}Campus,campus.png,1,2,0\n");
        assert!(matches!(
            MapCatalog::from_csv_str(&missing_column, Path::new(".")),
            Err(PitlaneError::CatalogParse { line: 2, .. })
        ));

        let bad_number = format!("{header}Campus,campus.png,1,2,zero,3\n");
        assert!(matches!(
            MapCatalog::from_csv_str(&bad_number, Path::new(".")),
            Err(PitlaneError::CatalogParse { line: 2, .. })
        ));

        let duplicate = format!("{header}A,a.png,1,2,0,3\nA,b.png,1,2,0,3\n");
        assert!(matches!(
            MapCatalog::from_csv_str(&duplicate, Path::new(".")),
            Err(PitlaneError::CatalogParse { line: 3, .. })
        ));
    }

    #[test]
    fn test_quoted_names_may_contain_commas() {
        let text = "Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2
\"Track, North\",north.png,10,20,0,30
\"The \"\"Oval\"\"\" , oval.png,10,20,0,30
";
        let catalog = MapCatalog::from_csv_str(text, Path::new(".")).unwrap();

        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["Track, North", "The \"Oval\""]
        );
        assert_eq!(catalog.entry("Track, North").unwrap().filename, "north.png");
        assert_eq!(catalog.entry("The \"Oval\"").unwrap().filename, "oval.png");
    }

    #[test]
    fn test_broken_quoting_is_a_parse_error() {
        let header = "Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2\n";

        let unterminated = format!("{header}\"Track, North,north.png,10,20,0,30\n");
        assert!(matches!(
            MapCatalog::from_csv_str(&unterminated, Path::new(".")),
            Err(PitlaneError::CatalogParse { line: 2, .. })
        ));

        let trailing = format!("{header}\"Track\"x,north.png,10,20,0,30\n");
        assert!(matches!(
            MapCatalog::from_csv_str(&trailing, Path::new(".")),
            Err(PitlaneError::CatalogParse { line: 2, .. })
        ));
    }

    #[test]
    fn test_degenerate_box_rejected_at_load() {
        let text = "Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2\nFlat,flat.png,5,20,5,30\n";

        assert!(matches!(
            MapCatalog::from_csv_str(text, Path::new(".")),
            Err(PitlaneError::GeometryDegenerate { .. })
        ));
    }

    #[test]
    fn test_lookup_decodes_once_and_caches() {
        let dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(160, 100, Rgba([0, 128, 0, 255]))
            .save(dir.path().join("track.png"))
            .unwrap();
        let mut catalog = MapCatalog::from_csv_str(CATALOG, dir.path()).unwrap();

        assert!(!catalog.is_cached("Test Track"));
        let first = catalog.lookup("Test Track").unwrap();
        assert!(catalog.is_cached("Test Track"));
        assert_eq!((first.width(), first.height()), (160, 100));

        // removing the file proves the second lookup is served from memory
        fs::remove_file(dir.path().join("track.png")).unwrap();
        let second = catalog.lookup("Test Track").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lookup_errors() {
        let dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]))
            .save(dir.path().join("track.png"))
            .unwrap();
        let mut catalog = MapCatalog::from_csv_str(CATALOG, dir.path()).unwrap();

        assert!(matches!(
            catalog.lookup("Nowhere"),
            Err(PitlaneError::UnknownMap { .. })
        ));
        // campus.png was never written
        assert!(matches!(
            catalog.lookup("Campus"),
            Err(PitlaneError::MapLoad { .. })
        ));
        // square image breaks the 8:5 contract
        assert!(matches!(
            catalog.lookup("Test Track"),
            Err(PitlaneError::MapLoad { .. })
        ));
        assert!(!catalog.is_cached("Test Track"));
    }
}
