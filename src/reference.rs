//! Static reference datasets: geocoding fallback tables and the landmass
//! boundary used to clip corridors.
//!
//! The embedded copies are parsed once per process and shared immutably.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::Coordinate;

const EMBEDDED_LOCATIONS: &str = include_str!("../data/fallback_locations.toml");
const EMBEDDED_LANDMASS: &str = include_str!("../data/landmass.toml");

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to parse reference data: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid landmass polygon '{0}': needs at least 3 points")]
    DegeneratePolygon(String),
}

/// A known place in the fallback tables
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnownPlace {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

impl KnownPlace {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize)]
struct CityRow {
    key: String,
    #[serde(flatten)]
    place: KnownPlace,
}

#[derive(Debug, Deserialize)]
struct ZipRow {
    zip: String,
    #[serde(flatten)]
    place: KnownPlace,
}

#[derive(Debug, Deserialize)]
struct LocationsFile {
    #[serde(default, rename = "city")]
    cities: Vec<CityRow>,
    #[serde(default, rename = "zip")]
    zips: Vec<ZipRow>,
}

#[derive(Debug, Deserialize)]
struct PolygonRow {
    name: String,
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct LandmassFile {
    #[serde(default, rename = "polygon")]
    polygons: Vec<PolygonRow>,
}

/// Immutable lookup tables and boundary geometry
#[derive(Debug, Clone)]
pub struct ReferenceData {
    /// Lowercase city keys in match priority order
    cities: Vec<(String, KnownPlace)>,
    zips: HashMap<String, KnownPlace>,
    landmass: MultiPolygon<f64>,
}

impl Default for ReferenceData {
    /// No tables and no landmass, so every lookup misses and clipping is skipped
    fn default() -> Self {
        Self {
            cities: Vec::new(),
            zips: HashMap::new(),
            landmass: MultiPolygon::new(vec![]),
        }
    }
}

impl ReferenceData {
    /// Parse reference data from TOML documents
    pub fn from_toml(locations: &str, landmass: &str) -> Result<Self, ReferenceError> {
        let locations: LocationsFile = toml::from_str(locations)?;
        let landmass: LandmassFile = toml::from_str(landmass)?;

        let cities = locations
            .cities
            .into_iter()
            .map(|row| (row.key.to_lowercase(), row.place))
            .collect();

        let zips = locations
            .zips
            .into_iter()
            .map(|row| (row.zip, row.place))
            .collect();

        let polygons = landmass
            .polygons
            .into_iter()
            .map(|row| {
                if row.coordinates.len() < 3 {
                    return Err(ReferenceError::DegeneratePolygon(row.name));
                }
                let exterior: LineString<f64> = row
                    .coordinates
                    .iter()
                    .map(|[lng, lat]| Coord { x: *lng, y: *lat })
                    .collect();
                Ok(Polygon::new(exterior, vec![]))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cities,
            zips,
            landmass: MultiPolygon::new(polygons),
        })
    }

    /// The datasets compiled into the binary, parsed on first use
    pub fn embedded() -> &'static ReferenceData {
        static DATA: OnceLock<ReferenceData> = OnceLock::new();
        DATA.get_or_init(|| {
            ReferenceData::from_toml(EMBEDDED_LOCATIONS, EMBEDDED_LANDMASS).unwrap_or_else(|e| {
                tracing::error!("Embedded reference data is unusable, fallbacks disabled: {}", e);
                ReferenceData::default()
            })
        })
    }

    /// First city whose key appears in the lowercased query
    pub fn find_city(&self, query: &str) -> Option<&KnownPlace> {
        let query = query.to_lowercase();
        self.cities
            .iter()
            .find(|(key, _)| !key.is_empty() && query.contains(key.as_str()))
            .map(|(_, place)| place)
    }

    pub fn find_zip(&self, zip: &str) -> Option<&KnownPlace> {
        self.zips.get(zip)
    }

    pub fn landmass(&self) -> &MultiPolygon<f64> {
        &self.landmass
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }
}

/// First run of exactly five ASCII digits, e.g. the ZIP in "Davidson, NC 28036-1234"
pub fn extract_zip(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = None;

    for i in 0..=bytes.len() {
        let is_digit = i < bytes.len() && bytes[i].is_ascii_digit();
        match (start, is_digit) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                if i - s == 5 {
                    return Some(&text[s..i]);
                }
                start = None;
            }
            _ => {}
        }
    }

    None
}
