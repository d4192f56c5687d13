//! Spherical-earth geodesy.
//!
//! Every earth-surface calculation in the engine goes through the two
//! functions in this module: [`destination_point`] and [`distance_between`].
//! Coordinates are `geo_types::Coord<f64>` with `x = longitude` and
//! `y = latitude`, both in degrees. Distances are in meters.

use geo_types::Coord;

/// Mean earth radius used for all spherical math (meters).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Builds a coordinate from latitude and longitude in degrees.
pub fn lat_lng(lat: f64, lng: f64) -> Coord<f64> {
    Coord { x: lng, y: lat }
}

/// Normalizes a bearing into `[0, 360)`.
pub fn normalize_bearing(bearing_deg: f64) -> f64 {
    let b = bearing_deg.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Wraps a longitude into `[-180, 180)`.
fn normalize_longitude(lng_deg: f64) -> f64 {
    (lng_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Projects a point `distance_m` meters from `origin` along `bearing_deg`.
///
/// Uses the forward azimuth formula on a sphere of radius [`EARTH_RADIUS_M`].
/// Bearings outside `[0, 360)` are wrapped, the resulting longitude is wrapped
/// across the antimeridian, and the latitude argument is clamped so rounding
/// never produces NaN. Non-finite distance or bearing returns `origin`.
pub fn destination_point(origin: Coord<f64>, distance_m: f64, bearing_deg: f64) -> Coord<f64> {
    if !distance_m.is_finite() || !bearing_deg.is_finite() {
        return origin;
    }

    let angular = distance_m / EARTH_RADIUS_M;
    let theta = normalize_bearing(bearing_deg).to_radians();
    let phi1 = origin.y.to_radians();
    let lambda1 = origin.x.to_radians();

    let sin_phi2 =
        (phi1.sin() * angular.cos() + phi1.cos() * angular.sin() * theta.cos()).clamp(-1.0, 1.0);
    let phi2 = sin_phi2.asin();
    let lambda2 = lambda1
        + (theta.sin() * angular.sin() * phi1.cos()).atan2(angular.cos() - phi1.sin() * sin_phi2);

    lat_lng(phi2.to_degrees(), normalize_longitude(lambda2.to_degrees()))
}

/// Great-circle distance between two points in meters (haversine).
pub fn distance_between(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let phi1 = a.y.to_radians();
    let phi2 = b.y.to_radians();
    let d_phi = (b.y - a.y).to_radians();
    let d_lambda = (b.x - a.x).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b` in degrees `[0, 360)`.
pub fn bearing_between(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let phi1 = a.y.to_radians();
    let phi2 = b.y.to_radians();
    let d_lambda = (b.x - a.x).to_radians();

    let x = d_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_bearing(x.atan2(y).to_degrees())
}

/// 8-point compass label for a bearing (N, NE, E, ...).
pub fn cardinal_direction(bearing_deg: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = (normalize_bearing(bearing_deg) / 45.0).round() as usize % 8;
    DIRECTIONS[index]
}
