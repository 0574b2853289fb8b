//! Conversion of raw Overpass elements into [`Tree`] and [`Stump`] records.
//!
//! Mapping is tolerant: an element that lacks an id or a position is
//! counted as a failure and skipped, and the rest of the batch carries on.
//! Optional tags are coerced where possible (`"15.0"` becomes `15.0`) and
//! dropped otherwise.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::MappingError;
use crate::model::{Feature, FeatureKind, Stump, Tree};
use crate::overpass::Element;

/// Outcome of mapping one batch of elements.
#[derive(Debug, Clone, Default)]
pub struct MappedBatch {
    /// Successfully mapped records, in upstream order.
    pub features: Vec<Feature>,
    /// Number of node elements mapped.
    pub processed: usize,
    /// Number of node elements that failed to map.
    pub failed: usize,
    /// Number of non-node elements ignored.
    pub skipped: usize,
}

/// String tag, trimmed. Empty strings count as absent.
fn tag_string(element: &Element, key: &str) -> Option<String> {
    match element.tags.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Float tag, from a JSON number or a numeric string.
fn tag_f64(element: &Element, key: &str) -> Option<f64> {
    let value = match element.tags.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Integer tag, from a JSON integer or an integer string.
fn tag_i64(element: &Element, key: &str) -> Option<i64> {
    match element.tags.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Required id and position of an element.
///
/// Falls back to `center` when `lat`/`lon` are missing.
fn identity(element: &Element) -> Result<(u64, f64, f64), MappingError> {
    let id = element.id.ok_or(MappingError::MissingId)?;
    let position = match (element.lat, element.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => element.center.map(|c| (c.lat, c.lon)),
    };
    match position {
        Some((lat, lon)) if lat.is_finite() && lon.is_finite() => Ok((id, lat, lon)),
        _ => Err(MappingError::MissingPosition { id }),
    }
}

/// Map one element to a tree.
///
/// # Errors
///
/// Returns [`MappingError`] if the id or position is missing.
pub fn map_tree(element: &Element, now: DateTime<Utc>) -> Result<Tree, MappingError> {
    let (id, lat, lon) = identity(element)?;
    Ok(Tree {
        id: format!("{}_{}", FeatureKind::Tree.id_prefix(), id),
        lat,
        lon,
        species: tag_string(element, "species"),
        height: tag_f64(element, "height"),
        diameter: tag_f64(element, "diameter"),
        age: tag_i64(element, "age"),
        health: tag_string(element, "health"),
        last_updated: Some(now),
    })
}

/// Map one element to a stump.
///
/// # Errors
///
/// Returns [`MappingError`] if the id or position is missing.
pub fn map_stump(element: &Element, now: DateTime<Utc>) -> Result<Stump, MappingError> {
    let (id, lat, lon) = identity(element)?;
    Ok(Stump {
        id: format!("{}_{}", FeatureKind::Stump.id_prefix(), id),
        lat,
        lon,
        species: tag_string(element, "species"),
        diameter: tag_f64(element, "diameter"),
        removal_date: Some(now),
        reason: tag_string(element, "removal_reason"),
    })
}

/// Map one element to a record of the given kind.
///
/// # Errors
///
/// Returns [`MappingError`] if the id or position is missing.
pub fn map_element(
    kind: FeatureKind,
    element: &Element,
    now: DateTime<Utc>,
) -> Result<Feature, MappingError> {
    match kind {
        FeatureKind::Tree => map_tree(element, now).map(Feature::Tree),
        FeatureKind::Stump => map_stump(element, now).map(Feature::Stump),
    }
}

/// Map up to `limit` elements, stamping every record with `now`.
///
/// Non-node elements are skipped silently. Nodes that fail to map are
/// logged and counted in [`MappedBatch::failed`].
pub fn map_elements(
    kind: FeatureKind,
    elements: &[Element],
    limit: usize,
    now: DateTime<Utc>,
) -> MappedBatch {
    let mut batch = MappedBatch::default();

    for element in elements.iter().take(limit) {
        if !element.is_node() {
            batch.skipped += 1;
            continue;
        }

        match map_element(kind, element, now) {
            Ok(feature) => {
                batch.features.push(feature);
                batch.processed += 1;
            }
            Err(e) => {
                batch.failed += 1;
                tracing::warn!(
                    kind = %kind,
                    element_id = ?element.id,
                    error = %e,
                    "Skipping element that could not be mapped"
                );
            }
        }
    }

    batch
}

/// Sorted, de-duplicated `species` tags across `elements`, of any type.
pub fn collect_species(elements: &[Element]) -> Vec<String> {
    elements
        .iter()
        .filter_map(|element| tag_string(element, "species"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overpass::{Center, OverpassResponse};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn element(value: Value) -> Element {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_map_tree_example() {
        let e = element(json!({
            "type": "node", "id": 123, "lat": 36.65, "lon": -6.35,
            "tags": {"species": "Pinus pinea", "height": "15.0"}
        }));

        let tree = map_tree(&e, now()).unwrap();
        assert_eq!(tree.id, "tree_123");
        assert_eq!(tree.lat, 36.65);
        assert_eq!(tree.lon, -6.35);
        assert_eq!(tree.species.as_deref(), Some("Pinus pinea"));
        assert_eq!(tree.height, Some(15.0));
        assert_eq!(tree.diameter, None);
        assert_eq!(tree.age, None);
        assert_eq!(tree.health, None);
        assert_eq!(tree.last_updated, Some(now()));
    }

    #[test]
    fn test_map_tree_coerces_tags() {
        let e = element(json!({
            "type": "node", "id": 1, "lat": 1.0, "lon": 2.0,
            "tags": {"height": 12, "diameter": " 0.8 ", "age": "25", "health": "good"}
        }));

        let tree = map_tree(&e, now()).unwrap();
        assert_eq!(tree.height, Some(12.0));
        assert_eq!(tree.diameter, Some(0.8));
        assert_eq!(tree.age, Some(25));
        assert_eq!(tree.health.as_deref(), Some("good"));
    }

    #[test]
    fn test_map_tree_invalid_tags_become_none() {
        let e = element(json!({
            "type": "node", "id": 1, "lat": 1.0, "lon": 2.0,
            "tags": {"height": "tall", "diameter": "NaN", "age": "25.5", "species": "", "health": 3}
        }));

        let tree = map_tree(&e, now()).unwrap();
        assert_eq!(tree.height, None);
        assert_eq!(tree.diameter, None);
        assert_eq!(tree.age, None);
        assert_eq!(tree.species, None);
        assert_eq!(tree.health, None);
    }

    #[test]
    fn test_map_stump() {
        let e = element(json!({
            "type": "node", "id": 77, "lat": 36.653, "lon": -6.347,
            "tags": {"species": "Eucalyptus", "diameter": "70", "removal_reason": "disease"}
        }));

        let stump = map_stump(&e, now()).unwrap();
        assert_eq!(stump.id, "stump_77");
        assert_eq!(stump.species.as_deref(), Some("Eucalyptus"));
        assert_eq!(stump.diameter, Some(70.0));
        assert_eq!(stump.reason.as_deref(), Some("disease"));
        assert_eq!(stump.removal_date, Some(now()));
    }

    #[test]
    fn test_missing_id_and_position() {
        let e = element(json!({"type": "node", "lat": 1.0, "lon": 2.0}));
        assert_eq!(map_tree(&e, now()).unwrap_err(), MappingError::MissingId);

        let e = element(json!({"type": "node", "id": 5, "lat": 1.0}));
        assert_eq!(
            map_stump(&e, now()).unwrap_err(),
            MappingError::MissingPosition { id: 5 }
        );
    }

    #[test]
    fn test_center_fallback() {
        let mut e = element(json!({"type": "node", "id": 5}));
        e.center = Some(Center { lat: 3.0, lon: 4.0 });
        let tree = map_tree(&e, now()).unwrap();
        assert_eq!((tree.lat, tree.lon), (3.0, 4.0));
    }

    #[test]
    fn test_map_elements_counts_failures() {
        let response: OverpassResponse = serde_json::from_value(json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 1.0, "lon": 1.0},
                {"type": "node", "id": 2, "lon": 1.0},
                {"type": "node", "id": 3, "lat": 1.0, "lon": 1.0},
                {"type": "node", "id": 4},
                {"type": "node", "id": 5, "lat": 1.0, "lon": 1.0},
                {"type": "way", "id": 6, "center": {"lat": 1.0, "lon": 1.0}}
            ]
        }))
        .unwrap();

        let batch = map_elements(FeatureKind::Tree, &response.elements, 100, now());
        assert_eq!(batch.features.len(), 3);
        assert_eq!(batch.processed, 3);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.skipped, 1);

        let ids: Vec<&str> = batch.features.iter().map(Feature::id).collect();
        assert_eq!(ids, vec!["tree_1", "tree_3", "tree_5"]);
    }

    #[test]
    fn test_wrongly_typed_element_fails_alone() {
        let response: OverpassResponse = serde_json::from_str(
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 36.62, "lon": -6.35},
                {"type": "node", "id": 2, "lat": "x", "lon": -6.35},
                {"type": "node", "id": -3, "lat": 36.63, "lon": -6.36}
            ]}"#,
        )
        .unwrap();

        let batch = map_elements(FeatureKind::Tree, &response.elements, 100, now());
        assert_eq!(batch.processed, 1);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.features[0].id(), "tree_1");
    }

    #[test]
    fn test_map_elements_respects_limit() {
        let elements: Vec<Element> = (0..10)
            .map(|i| {
                element(json!({"type": "node", "id": i, "lat": 1.0, "lon": 1.0}))
            })
            .collect();

        let batch = map_elements(FeatureKind::Stump, &elements, 4, now());
        assert_eq!(batch.features.len(), 4);
        assert_eq!(batch.features[3].id(), "stump_3");
    }
}
