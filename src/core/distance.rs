use crate::models::Coordinate;

/// Earth's radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Kilometers per statute mile
pub const KM_PER_MILE: f64 = 1.609344;

/// Calculate the Haversine distance between two points in miles
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in miles
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Great-circle distance between two coordinates in miles
#[inline]
pub fn distance_miles(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_distance(a.lat, a.lng, b.lat, b.lng)
}

/// Sum of the great-circle legs through `waypoints`, in visit order
///
/// This is the mileage estimate used when the routing provider can't answer.
pub fn straight_line_miles(waypoints: &[Coordinate]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| distance_miles(&pair[0], &pair[1]))
        .sum()
}

#[inline]
pub fn miles_to_km(miles: f64) -> f64 {
    miles * KM_PER_MILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // Charlotte to Raleigh is roughly 130 miles as the crow flies
        let charlotte = Coordinate::new(35.2271, -80.8431);
        let raleigh = Coordinate::new(35.7796, -78.6382);

        let distance = distance_miles(&charlotte, &raleigh);
        assert!((distance - 130.0).abs() < 5.0, "Distance should be ~130mi, got {}", distance);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Coordinate::new(35.4993, -80.8481);
        assert_eq!(distance_miles(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(35.2271, -80.8431);
        let b = Coordinate::new(33.7490, -84.3880);
        assert_eq!(distance_miles(&a, &b), distance_miles(&b, &a));
    }

    #[test]
    fn test_straight_line_miles() {
        let a = Coordinate::new(35.0, -80.0);
        let b = Coordinate::new(36.0, -80.0);
        let c = Coordinate::new(37.0, -80.0);

        let total = straight_line_miles(&[a, b, c]);
        assert!((total - distance_miles(&a, &c)).abs() < 1e-6);
        assert_eq!(straight_line_miles(&[a]), 0.0);
        assert_eq!(straight_line_miles(&[]), 0.0);
    }
}
