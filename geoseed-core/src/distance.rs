//! Great-circle distance between geographic points.
//!
//! Two interchangeable formulas are provided: the spherical law of cosines
//! and Haversine. Both work on radians internally and scale by the mean
//! Earth radius of the requested unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mean radius of the Earth in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Mean radius of the Earth in miles.
pub const EARTH_RADIUS_MI: f64 = 3959.0;

/// Error type for malformed coordinates.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("Longitude {0} outside [-180, 180]")]
    Longitude(f64),
    #[error("Latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("Unknown distance formula: {0}")]
    UnknownFormula(String),
}

/// A point on the Earth's surface, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point, rejecting coordinates outside the valid ranges.
    pub fn new(lon: f64, lat: f64) -> Result<Self, GeoError> {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::Longitude(lon));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        Ok(Self { lon, lat })
    }

    /// The same point as `(lon, lat)` in radians.
    pub fn to_radians(&self) -> (f64, f64) {
        (self.lon.to_radians(), self.lat.to_radians())
    }

    /// Distance to `other` in kilometers, using the law of cosines.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        Formula::LawOfCosines.distance(self, other, Unit::Kilometers)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.7}, {:.7}]", self.lon, self.lat)
    }
}

/// Unit a distance is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    Kilometers,
    Miles,
}

impl Unit {
    pub fn earth_radius(&self) -> f64 {
        match self {
            Unit::Kilometers => EARTH_RADIUS_KM,
            Unit::Miles => EARTH_RADIUS_MI,
        }
    }
}

/// Great-circle distance formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Formula {
    /// `R * acos(sin φ1 sin φ2 + cos φ1 cos φ2 cos Δλ)`
    #[default]
    LawOfCosines,
    /// `2R * asin(sqrt(hav Δφ + cos φ1 cos φ2 hav Δλ))`
    Haversine,
}

impl Formula {
    pub fn distance(&self, a: &GeoPoint, b: &GeoPoint, unit: Unit) -> f64 {
        let radius = unit.earth_radius();
        match self {
            Formula::LawOfCosines => law_of_cosines(a, b, radius),
            Formula::Haversine => haversine(a, b, radius),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Formula::LawOfCosines => "law-of-cosines",
            Formula::Haversine => "haversine",
        }
    }
}

impl FromStr for Formula {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "law-of-cosines" | "cosines" | "loc" => Ok(Formula::LawOfCosines),
            "haversine" | "hav" => Ok(Formula::Haversine),
            other => Err(GeoError::UnknownFormula(other.to_string())),
        }
    }
}

/// haversin(θ)
fn hav(theta: f64) -> f64 {
    0.5 * (1.0 - theta.cos())
}

/// Spherical law of cosines.
///
/// The acos argument is clamped to [-1, 1] so rounding overshoot on nearly
/// identical or antipodal points cannot produce NaN.
pub fn law_of_cosines(a: &GeoPoint, b: &GeoPoint, radius: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    let (lon1, lat1) = a.to_radians();
    let (lon2, lat2) = b.to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
    radius * cos_angle.clamp(-1.0, 1.0).acos()
}

/// Haversine formula.
pub fn haversine(a: &GeoPoint, b: &GeoPoint, radius: f64) -> f64 {
    let (lon1, lat1) = a.to_radians();
    let (lon2, lat2) = b.to_radians();

    let h = hav(lat2 - lat1) + lat1.cos() * lat2.cos() * hav(lon2 - lon1);
    2.0 * radius * h.clamp(0.0, 1.0).sqrt().asin()
}
