//! Inbound request normalization.
//!
//! Turns the raw `bbox`, `limit` and `timeout` parameters into a
//! [`NormalizedRequest`] with an effective result cap. The cap shrinks as the
//! bounding box grows so that large areas do not overload Overpass:
//!
//! | Area (deg²)        | Effective limit          |
//! |--------------------|--------------------------|
//! | `<= 0.005`         | `min(requested, 1000)`   |
//! | `(0.005, 0.01]`    | `min(requested, 500)`    |
//! | `> 0.01`           | `min(requested, 200)`    |

use crate::bbox::BoundingBox;
use crate::error::Result;

/// Result limit used when the caller does not give one.
pub const DEFAULT_LIMIT: i64 = 500;

/// Overpass `[timeout:N]` setting used when the caller does not give one.
pub const DEFAULT_QUERY_TIMEOUT: u32 = 6000;

/// Hard ceiling on the number of elements requested from Overpass.
pub const MAX_LIMIT: u32 = 1000;

/// Areas above this many square degrees are capped at [`LARGE_AREA_LIMIT`].
pub const LARGE_AREA_THRESHOLD: f64 = 0.01;

/// Cap for areas above [`LARGE_AREA_THRESHOLD`].
pub const LARGE_AREA_LIMIT: u32 = 200;

/// Areas above this many square degrees are capped at [`MEDIUM_AREA_LIMIT`].
pub const MEDIUM_AREA_THRESHOLD: f64 = 0.005;

/// Cap for areas above [`MEDIUM_AREA_THRESHOLD`].
pub const MEDIUM_AREA_LIMIT: u32 = 500;

/// Compute the effective result limit for a requested limit and bbox area.
///
/// Negative requests clamp to zero.
pub fn effective_limit(requested: i64, area: f64) -> u32 {
    let mut limit = requested.clamp(0, i64::from(MAX_LIMIT)) as u32;
    if requested > i64::from(MAX_LIMIT) {
        tracing::warn!(
            requested = requested,
            limit = limit,
            "Limit reduced to the maximum allowed"
        );
    }

    if area > LARGE_AREA_THRESHOLD {
        limit = limit.min(LARGE_AREA_LIMIT);
        tracing::warn!(area = area, limit = limit, "Very large area, capping results");
    } else if area > MEDIUM_AREA_THRESHOLD {
        limit = limit.min(MEDIUM_AREA_LIMIT);
        tracing::info!(area = area, limit = limit, "Large area, capping results");
    }

    limit
}

/// Raw feature request parameters, as received from a client.
#[derive(Debug, Clone, Default)]
pub struct FeatureRequest {
    /// `min_lat,min_lon,max_lat,max_lon`, if given.
    pub bbox: Option<String>,
    /// Requested maximum number of results.
    pub limit: Option<i64>,
    /// Overpass server-side timeout hint.
    pub timeout: Option<u32>,
    /// Only return features with this exact `species` tag.
    pub species: Option<String>,
}

impl FeatureRequest {
    /// Create a request for the given bounding box with default settings.
    pub fn new(bbox: impl Into<String>) -> Self {
        Self {
            bbox: Some(bbox.into()),
            ..Default::default()
        }
    }

    /// Set the requested limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the Overpass timeout hint.
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Restrict results to one species.
    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    /// Validate the request and derive the effective limit.
    ///
    /// Returns `Ok(None)` when no bounding box was given: there is nothing
    /// to query, and that is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBbox`](crate::Error::InvalidBbox) if the
    /// bounding box is malformed.
    pub fn normalize(&self) -> Result<Option<NormalizedRequest>> {
        let raw = match self.bbox.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                tracing::debug!("No bbox given, nothing to query");
                return Ok(None);
            }
        };

        let bbox = BoundingBox::parse(raw)?;
        let area = bbox.area();
        tracing::debug!(bbox = %bbox, area = area, "Parsed bbox");

        let limit = effective_limit(self.limit.unwrap_or(DEFAULT_LIMIT), area);
        let timeout = match self.timeout {
            Some(0) | None => DEFAULT_QUERY_TIMEOUT,
            Some(t) => t,
        };
        let species = self
            .species
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Some(NormalizedRequest {
            bbox,
            limit,
            timeout,
            species,
        }))
    }
}

/// A validated request, ready to be turned into an Overpass query.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    /// Validated bounding box.
    pub bbox: BoundingBox,
    /// Effective result limit.
    pub limit: u32,
    /// Overpass `[timeout:N]` setting.
    pub timeout: u32,
    /// Optional species filter.
    pub species: Option<String>,
}

impl NormalizedRequest {
    /// Build a request directly from parts, applying the limit rules.
    pub fn new(bbox: BoundingBox, requested_limit: i64) -> Self {
        Self {
            bbox,
            limit: effective_limit(requested_limit, bbox.area()),
            timeout: DEFAULT_QUERY_TIMEOUT,
            species: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_effective_limit_small_area() {
        assert_eq!(effective_limit(800, 0.0024), 800);
        assert_eq!(effective_limit(5000, 0.0024), MAX_LIMIT);
        assert_eq!(effective_limit(10, 0.005), 10);
        assert_eq!(effective_limit(1000, 0.005), 1000); // threshold is exclusive
    }

    #[test]
    fn test_effective_limit_medium_area() {
        assert_eq!(effective_limit(800, 0.006), 500);
        assert_eq!(effective_limit(300, 0.006), 300);
        assert_eq!(effective_limit(1000, 0.01), 500); // threshold is exclusive
    }

    #[test]
    fn test_effective_limit_large_area() {
        assert_eq!(effective_limit(800, 0.02), 200);
        assert_eq!(effective_limit(150, 5.0), 150);
        assert_eq!(effective_limit(i64::MAX, 5.0), 200);
    }

    #[test]
    fn test_effective_limit_negative() {
        assert_eq!(effective_limit(-5, 0.001), 0);
    }

    #[test]
    fn test_effective_limit_tiers_hold_for_all_requests() {
        for requested in [0, 1, 199, 200, 201, 499, 500, 501, 999, 1000, 1001, 50_000] {
            let expected_small = requested.min(1000) as u32;
            assert_eq!(effective_limit(requested, 0.001), expected_small);
            assert!(effective_limit(requested, 0.0075) <= 500);
            assert!(effective_limit(requested, 0.5) <= 200);
        }
    }

    #[test]
    fn test_normalize_missing_bbox() {
        assert_eq!(FeatureRequest::default().normalize().unwrap(), None);

        let blank = FeatureRequest::new("   ");
        assert_eq!(blank.normalize().unwrap(), None);
    }

    #[test]
    fn test_normalize_defaults() {
        let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33")
            .normalize()
            .unwrap()
            .unwrap();
        assert_eq!(request.limit, 500);
        assert_eq!(request.timeout, DEFAULT_QUERY_TIMEOUT);
        assert_eq!(request.species, None);
    }

    #[test]
    fn test_normalize_example_bbox_keeps_limit() {
        let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33")
            .with_limit(800)
            .normalize()
            .unwrap()
            .unwrap();
        assert_eq!(request.limit, 800);
    }

    #[test]
    fn test_normalize_zero_timeout_uses_default() {
        let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33")
            .with_timeout(0)
            .normalize()
            .unwrap()
            .unwrap();
        assert_eq!(request.timeout, DEFAULT_QUERY_TIMEOUT);

        let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33")
            .with_timeout(25)
            .normalize()
            .unwrap()
            .unwrap();
        assert_eq!(request.timeout, 25);
    }

    #[test]
    fn test_normalize_species_trimmed() {
        let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33")
            .with_species("  Pinus pinea ")
            .normalize()
            .unwrap()
            .unwrap();
        assert_eq!(request.species.as_deref(), Some("Pinus pinea"));

        let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33")
            .with_species("")
            .normalize()
            .unwrap()
            .unwrap();
        assert_eq!(request.species, None);
    }

    #[test]
    fn test_normalize_malformed_bbox() {
        let result = FeatureRequest::new("36.61,-6.41").normalize();
        assert!(matches!(result, Err(Error::InvalidBbox(_))));
    }
}
