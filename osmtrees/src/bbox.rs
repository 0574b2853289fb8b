//! Geographic bounding boxes.

use std::fmt;
use std::str::FromStr;

use crate::error::BboxError;

/// A geographic bounding box used to filter Overpass queries.
///
/// Coordinates are in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum latitude (southern boundary).
    pub min_lat: f64,
    /// Minimum longitude (western boundary).
    pub min_lon: f64,
    /// Maximum latitude (northern boundary).
    pub max_lat: f64,
    /// Maximum longitude (eastern boundary).
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Arguments
    ///
    /// * `min_lat` - Southern boundary latitude
    /// * `min_lon` - Western boundary longitude
    /// * `max_lat` - Northern boundary latitude
    /// * `max_lon` - Eastern boundary longitude
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Parse a `min_lat,min_lon,max_lat,max_lon` string.
    ///
    /// Whitespace around each component is ignored. The corners are taken
    /// as given; a box with swapped corners is still accepted because the
    /// area is computed from absolute spans.
    ///
    /// # Errors
    ///
    /// Returns [`BboxError`] if the string does not hold exactly four finite
    /// numbers.
    pub fn parse(input: &str) -> Result<Self, BboxError> {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxError::ComponentCount {
                input: input.to_string(),
                found: parts.len(),
            });
        }

        let mut values = [0.0_f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| BboxError::InvalidNumber {
                input: input.to_string(),
                component: (*part).to_string(),
            })?;
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(BboxError::NonFinite {
                input: input.to_string(),
            });
        }

        let [min_lat, min_lon, max_lat, max_lon] = values;
        Ok(Self::new(min_lat, min_lon, max_lat, max_lon))
    }

    /// Area in square degrees: `|Δlat| × |Δlon|`.
    ///
    /// This is not a geodesic area; it is only used to pick a result cap.
    pub fn area(&self) -> f64 {
        (self.max_lat - self.min_lat).abs() * (self.max_lon - self.min_lon).abs()
    }
}

impl FromStr for BoundingBox {
    type Err = BboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Formats as the Overpass QL bbox filter body: `min_lat,min_lon,max_lat,max_lon`.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}
