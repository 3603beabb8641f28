//! Great-circle distance on a spherical earth
//!
//! The PostgreSQL store evaluates the same haversine formula in SQL, so both
//! stores agree on which listings fall inside a radius.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean earth radius in statute miles
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Mean earth radius in kilometers (IUGG)
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Unit a proximity radius is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    #[serde(rename = "km", alias = "kilometers")]
    Kilometers,
}

impl DistanceUnit {
    /// Earth radius expressed in this unit
    #[must_use]
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Miles => EARTH_RADIUS_MILES,
            Self::Kilometers => EARTH_RADIUS_KM,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Miles => write!(f, "mi"),
            Self::Kilometers => write!(f, "km"),
        }
    }
}

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both coordinates are finite and on the globe
    pub fn validate(&self) -> Result<(), String> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} is outside [-90, 90]", self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("longitude {} is outside [-180, 180]", self.lng));
        }
        Ok(())
    }
}

/// Haversine distance between two points, in `unit`
#[must_use]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    2.0 * unit.earth_radius() * h.min(1.0).sqrt().asin()
}

/// Largest latitude difference, in degrees, two points within `radius` can have
///
/// Great-circle distance is never shorter than the meridian arc, so this band
/// never excludes a true match.
#[must_use]
pub fn latitude_band(radius: f64, unit: DistanceUnit) -> f64 {
    // rounding slack so boundary points survive the band check
    (radius / unit.earth_radius()).to_degrees() + 1e-9
}
