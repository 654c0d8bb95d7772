use geo::{BooleanOps, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Simplify};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::core::distance::miles_to_km;
use crate::reference::ReferenceData;

/// Kilometers per degree of latitude
const KM_PER_DEG_LAT: f64 = 110.574;

/// Kilometers per degree of longitude at the equator
const KM_PER_DEG_LNG: f64 = 111.320;

/// Sides of the polygon approximating the round cap at each route vertex
const CAP_SEGMENTS: usize = 16;

/// Routes are simplified until they have at most this many vertices
const MAX_BUFFER_VERTICES: usize = 400;

/// A search polygon around a route, in `[lng, lat]` coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Corridor {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Corridor {
    fn from_multi(mut multi: MultiPolygon<f64>) -> Option<Self> {
        match multi.0.len() {
            0 => None,
            1 => multi.0.pop().map(Corridor::Polygon),
            _ => Some(Corridor::MultiPolygon(multi)),
        }
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            Corridor::Polygon(polygon) => MultiPolygon::new(vec![polygon.clone()]),
            Corridor::MultiPolygon(multi) => multi.clone(),
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        point_in_corridor(lat, lng, self)
    }

    /// Exterior rings as `[lng, lat]` pairs, one per polygon
    pub fn rings(&self) -> Vec<Vec<[f64; 2]>> {
        self.to_multi_polygon()
            .0
            .iter()
            .map(|polygon| polygon.exterior().coords().map(|c| [c.x, c.y]).collect())
            .collect()
    }
}

/// Serializable view of a corridor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorRings {
    pub polygons: Vec<Vec<[f64; 2]>>,
}

impl From<&Corridor> for CorridorRings {
    fn from(corridor: &Corridor) -> Self {
        Self {
            polygons: corridor.rings(),
        }
    }
}

/// Buffer a route into a corridor, optionally trimmed to the embedded landmass
pub fn build_corridor(route: &LineString<f64>, width_miles: f64, clip_to_land: bool) -> Option<Corridor> {
    let boundary = clip_to_land.then(|| ReferenceData::embedded().landmass());
    build_corridor_within(route, width_miles, boundary)
}

/// Buffer a route into a corridor, optionally intersected with `boundary`
///
/// Never fails: a buffering error yields `None`, a clipping error or an empty
/// intersection yields the unclipped buffer.
pub fn build_corridor_within(
    route: &LineString<f64>,
    width_miles: f64,
    boundary: Option<&MultiPolygon<f64>>,
) -> Option<Corridor> {
    if !width_miles.is_finite() || width_miles <= 0.0 || route.0.is_empty() {
        tracing::debug!("Skipping corridor: width={} points={}", width_miles, route.0.len());
        return None;
    }

    let width_km = miles_to_km(width_miles);

    let buffered = match catch_unwind(AssertUnwindSafe(|| buffer_line(route, width_km))) {
        Ok(buffered) if !buffered.0.is_empty() => buffered,
        Ok(_) => {
            tracing::warn!("Route buffering produced an empty polygon");
            return None;
        }
        Err(_) => {
            tracing::warn!("Route buffering failed, no corridor available");
            return None;
        }
    };

    let Some(boundary) = boundary.filter(|b| !b.0.is_empty()) else {
        return Corridor::from_multi(buffered);
    };

    match catch_unwind(AssertUnwindSafe(|| buffered.intersection(boundary))) {
        Ok(clipped) if !clipped.0.is_empty() => Corridor::from_multi(clipped),
        Ok(_) => {
            tracing::warn!("Corridor lies entirely outside the land boundary, using unclipped buffer");
            Corridor::from_multi(buffered)
        }
        Err(_) => {
            tracing::warn!("Land clipping failed, using unclipped buffer");
            Corridor::from_multi(buffered)
        }
    }
}

/// Point-in-polygon test against a single or multi-polygon corridor
pub fn point_in_corridor(lat: f64, lng: f64, corridor: &Corridor) -> bool {
    let point = Point::new(lng, lat);
    match corridor {
        Corridor::Polygon(polygon) => polygon.contains(&point),
        Corridor::MultiPolygon(multi) => multi.0.iter().any(|polygon| polygon.contains(&point)),
    }
}

/// Union of a quad per segment and a round cap per vertex
fn buffer_line(route: &LineString<f64>, width_km: f64) -> MultiPolygon<f64> {
    let line = simplify_for_buffer(route, width_km);
    let coords: Vec<Coord<f64>> = line.coords().copied().collect();

    let mut pieces: Vec<MultiPolygon<f64>> = coords
        .iter()
        .map(|c| MultiPolygon::new(vec![cap(*c, width_km)]))
        .collect();

    pieces.extend(
        coords
            .windows(2)
            .filter_map(|pair| segment_quad(pair[0], pair[1], width_km))
            .map(|quad| MultiPolygon::new(vec![quad])),
    );

    union_all(pieces)
}

fn simplify_for_buffer(route: &LineString<f64>, width_km: f64) -> LineString<f64> {
    // Simplify asserts on fewer than two points, and two points have nothing to drop
    if route.0.len() < 3 {
        return route.clone();
    }

    let mut epsilon = width_km / KM_PER_DEG_LAT / 8.0;
    let mut line = route.simplify(&epsilon);

    while line.0.len() > MAX_BUFFER_VERTICES {
        epsilon *= 2.0;
        line = route.simplify(&epsilon);
    }

    line
}

/// Polygon around `center` with radius `radius_km`
fn cap(center: Coord<f64>, radius_km: f64) -> Polygon<f64> {
    let (kx, ky) = km_per_degree(center.y);
    let ring: LineString<f64> = (0..CAP_SEGMENTS)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / CAP_SEGMENTS as f64;
            Coord {
                x: center.x + radius_km * theta.cos() / kx,
                y: center.y + radius_km * theta.sin() / ky,
            }
        })
        .collect();
    Polygon::new(ring, vec![])
}

/// Rectangle of half-width `width_km` along the segment `a → b`
fn segment_quad(a: Coord<f64>, b: Coord<f64>, width_km: f64) -> Option<Polygon<f64>> {
    let (kx, ky) = km_per_degree((a.y + b.y) / 2.0);
    let dx = (b.x - a.x) * kx;
    let dy = (b.y - a.y) * ky;
    let length = dx.hypot(dy);

    if length < 1e-9 {
        return None;
    }

    // unit normal, scaled back to degrees
    let ox = -dy / length * width_km / kx;
    let oy = dx / length * width_km / ky;

    let ring = LineString::from(vec![
        (a.x + ox, a.y + oy),
        (b.x + ox, b.y + oy),
        (b.x - ox, b.y - oy),
        (a.x - ox, a.y - oy),
    ]);
    Some(Polygon::new(ring, vec![]))
}

fn km_per_degree(lat: f64) -> (f64, f64) {
    let cos = lat.to_radians().cos().abs().max(0.01);
    (KM_PER_DEG_LNG * cos, KM_PER_DEG_LAT)
}

/// Pairwise union so each boolean op works on similarly sized inputs
fn union_all(mut pieces: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while pieces.len() > 1 {
        let mut merged = Vec::with_capacity(pieces.len() / 2 + 1);
        let mut iter = pieces.into_iter();
        while let Some(first) = iter.next() {
            match iter.next() {
                Some(second) => merged.push(first.union(&second)),
                None => merged.push(first),
            }
        }
        pieces = merged;
    }

    pieces.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charlotte_to_davidson() -> LineString<f64> {
        LineString::from(vec![(-80.8431, 35.2271), (-80.8481, 35.4993)])
    }

    #[test]
    fn test_corridor_contains_route() {
        let corridor = build_corridor(&charlotte_to_davidson(), 5.0, false).unwrap();

        assert!(corridor.contains(35.2271, -80.8431));
        assert!(corridor.contains(35.36, -80.845));
        assert!(corridor.contains(35.4993, -80.8481));
    }

    #[test]
    fn test_corridor_width() {
        let corridor = build_corridor(&charlotte_to_davidson(), 5.0, false).unwrap();

        // ~3 miles east of the midpoint is inside, ~8 miles east is not
        assert!(corridor.contains(35.36, -80.79));
        assert!(!corridor.contains(35.36, -80.70));
    }

    #[test]
    fn test_single_point_route_gets_round_corridor() {
        let route = LineString::from(vec![(-80.8431, 35.2271)]);
        let corridor = build_corridor(&route, 10.0, false).unwrap();

        assert!(corridor.contains(35.2271, -80.8431));
        assert!(corridor.contains(35.30, -80.8431));
        assert!(!corridor.contains(35.50, -80.8431));
    }

    #[test]
    fn test_invalid_width_or_empty_route() {
        assert!(build_corridor(&charlotte_to_davidson(), 0.0, false).is_none());
        assert!(build_corridor(&charlotte_to_davidson(), -1.0, false).is_none());
        assert!(build_corridor(&LineString::new(vec![]), 5.0, false).is_none());
    }

    #[test]
    fn test_clip_to_land_removes_ocean() {
        // Wilmington, NC out past Cape Fear into the Atlantic
        let route = LineString::from(vec![(-77.94, 34.23), (-76.5, 33.5)]);

        let unclipped = build_corridor(&route, 20.0, false).unwrap();
        let clipped = build_corridor(&route, 20.0, true).unwrap();

        assert!(unclipped.contains(33.5, -76.5));
        assert!(!clipped.contains(33.5, -76.5));
        assert!(clipped.contains(34.23, -77.94));
    }

    #[test]
    fn test_clip_fully_offshore_falls_back_to_buffer() {
        let route = LineString::from(vec![(-70.0, 30.0), (-69.0, 30.0)]);
        let corridor = build_corridor(&route, 10.0, true).unwrap();
        assert!(corridor.contains(30.0, -69.5));
    }

    #[test]
    fn test_point_in_multi_polygon() {
        let a = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]),
            vec![],
        );
        let b = Polygon::new(
            LineString::from(vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0)]),
            vec![],
        );
        let corridor = Corridor::MultiPolygon(MultiPolygon::new(vec![a, b]));

        assert!(point_in_corridor(0.5, 0.5, &corridor));
        assert!(point_in_corridor(5.5, 5.5, &corridor));
        assert!(!point_in_corridor(3.0, 3.0, &corridor));
    }

    #[test]
    fn test_long_route_is_simplified() {
        let route: LineString<f64> = (0..2000)
            .map(|i| Coord {
                x: -80.0 + i as f64 * 0.001,
                y: 35.0 + (i as f64 * 0.05).sin() * 0.01,
            })
            .collect();

        let simplified = simplify_for_buffer(&route, miles_to_km(5.0));
        assert!(simplified.0.len() <= MAX_BUFFER_VERTICES);
        assert_eq!(simplified.0.first(), route.0.first());
        assert_eq!(simplified.0.last(), route.0.last());
    }

    #[test]
    fn test_short_routes_skip_simplification() {
        let single = LineString::from(vec![(-80.8431, 35.2271)]);
        assert_eq!(simplify_for_buffer(&single, 16.0), single);

        let repeated = LineString::from(vec![(-80.8431, 35.2271), (-80.8431, 35.2271)]);
        assert_eq!(simplify_for_buffer(&repeated, 16.0), repeated);

        let corridor = build_corridor(&repeated, 10.0, false).unwrap();
        assert!(corridor.contains(35.2271, -80.8431));
    }
}

