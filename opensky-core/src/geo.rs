//! Great-circle distance on a spherical Earth.

/// Mean Earth radius used for trajectory distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Upper bound for any stored distance (half the circumference, rounded down).
pub const MAX_DISTANCE_KM: f64 = 20015.0;

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }
}

/// Spherical law of cosines, in kilometers.
///
/// The cosine term is clamped to [-1, 1]: identical points can land on
/// 1.0000000000000002, which is outside the domain of `acos`.
pub fn great_circle_km(start: GeoPoint, end: GeoPoint) -> f64 {
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();
    let lat2 = end.lat.to_radians();
    let lon2 = end.lon.to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}

/// Round to two decimals.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Distance as stored: rounded to 2 decimals and capped at `MAX_DISTANCE_KM`.
pub fn trajectory_distance_km(start: GeoPoint, end: GeoPoint) -> f64 {
    round_km(great_circle_km(start, end)).min(MAX_DISTANCE_KM)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
