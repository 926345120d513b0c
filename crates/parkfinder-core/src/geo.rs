//! Great-circle helpers on a spherical Earth.
//!
//! Latitude and longitude are in degrees, distances in metres. The spherical
//! model is accurate to well under a percent at the scales a park map works
//! at, which is all the re-query thresholds need.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const MILES_PER_METER: f64 = 0.000_621_37;

/// A point on the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Distance in metres to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(*self, *other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Haversine distance between two coordinates, in metres.
#[must_use]
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Projects `start` along `bearing_deg` (0 = north, 90 = east) for
/// `distance_m` metres.
#[must_use]
pub fn destination(start: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let lat1 = start.latitude.to_radians();
    let lon1 = start.longitude.to_radians();
    let bearing = bearing_deg.to_radians();
    let angular = distance_m / EARTH_RADIUS_METERS;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    let mut longitude = lon2.to_degrees();
    if longitude > 180.0 {
        longitude -= 360.0;
    } else if longitude < -180.0 {
        longitude += 360.0;
    }

    Coordinate::new(lat2.to_degrees(), longitude)
}

#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters * MILES_PER_METER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinate::new(40.759_211, -73.984_638);
        assert!(distance_meters(p, p).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(39.828_2, -98.579_5);
        let b = Coordinate::new(40.712_8, -74.006_0);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-6);
    }

    #[test]
    fn destination_north_matches_distance() {
        let start = Coordinate::new(35.227_1, -80.843_1);
        let end = destination(start, 0.0, 5_000.0);
        assert!(end.latitude > start.latitude);
        assert!((end.longitude - start.longitude).abs() < 1e-9);
        assert!((distance_meters(start, end) - 5_000.0).abs() < 0.5);
    }

    #[test]
    fn destination_east_keeps_distance() {
        let start = Coordinate::new(44.977_8, -93.265_0);
        let end = destination(start, 90.0, 12_345.0);
        assert!(end.longitude > start.longitude);
        assert!((distance_meters(start, end) - 12_345.0).abs() < 0.5);
    }

    #[test]
    fn destination_wraps_antimeridian() {
        let end = destination(Coordinate::new(0.0, 179.999), 90.0, 1_000.0);
        assert!(end.longitude < -179.0, "got {}", end.longitude);
    }

    #[test]
    fn meters_to_miles_converts() {
        assert!((meters_to_miles(1_609.344) - 1.0).abs() < 1e-3);
    }
}
