//! Great-circle distance helpers.

use geo::{point, HaversineDistance};

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let a = point!(x: lng1, y: lat1);
    let b = point!(x: lng2, y: lat2);
    a.haversine_distance(&b)
}
