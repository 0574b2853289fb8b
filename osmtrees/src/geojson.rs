//! GeoJSON export of mapped features.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use osmtrees::geojson::to_feature_collection;
//!
//! let collection = to_feature_collection(&batch.features)?;
//! println!("{}", collection);
//! // {"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point",...
//! ```

use geojson::{
    feature::Id, Feature as GeoJsonFeature, FeatureCollection, Geometry, JsonObject,
    Value as GeoJsonValue,
};

use crate::model::Feature;

/// Convert a single record into a GeoJSON point feature.
///
/// The record's fields (minus `lat`/`lon`, which live in the geometry) become
/// the feature's properties, plus a `kind` property (`"tree"` or `"stump"`).
/// Coordinates follow GeoJSON order: `[longitude, latitude]`.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized into a JSON object.
pub fn to_geojson_feature(feature: &Feature) -> serde_json::Result<GeoJsonFeature> {
    let mut properties: JsonObject = match serde_json::to_value(feature)? {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    properties.remove("lat");
    properties.remove("lon");
    properties.insert(
        "kind".to_string(),
        serde_json::Value::String(feature.kind().to_string()),
    );

    Ok(GeoJsonFeature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::Point(vec![
            feature.lon(),
            feature.lat(),
        ]))),
        id: Some(Id::String(feature.id().to_string())),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Convert records into a GeoJSON `FeatureCollection`.
///
/// # Errors
///
/// Returns an error if any record cannot be serialized.
pub fn to_feature_collection(features: &[Feature]) -> serde_json::Result<FeatureCollection> {
    let features = features
        .iter()
        .map(to_geojson_feature)
        .collect::<serde_json::Result<Vec<_>>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
