//! The request pipeline shared by every front end.

use std::time::Instant;

use chrono::Utc;

use crate::bbox::BoundingBox;
use crate::error::Result;
use crate::mapper::{collect_species, map_elements, MappedBatch};
use crate::model::FeatureKind;
use crate::overpass::{build_query, build_species_query, query_with_retry, UpstreamQuery};
use crate::request::{FeatureRequest, NormalizedRequest};

/// Overpass timeout setting for species queries.
pub const SPECIES_QUERY_TIMEOUT: u32 = 2500;

/// Species list served when Overpass fails or has nothing to offer.
pub const COMMON_GENERA: [&str; 10] = [
    "Acer", "Betula", "Fraxinus", "Pinus", "Platanus", "Populus", "Quercus", "Salix", "Tilia",
    "Ulmus",
];

/// Query `upstream` for `kind` features and map the result.
///
/// A zero effective limit yields an empty batch without a query.
///
/// # Errors
///
/// Returns [`Error::Upstream`](crate::Error::Upstream) if the query still
/// fails after retries. Elements that fail to map are counted, never fatal.
pub async fn fetch_features<Q>(
    upstream: &Q,
    kind: FeatureKind,
    request: &NormalizedRequest,
) -> Result<MappedBatch>
where
    Q: UpstreamQuery + ?Sized,
{
    if request.limit == 0 {
        tracing::warn!(kind = %kind, "Effective limit is 0, returning an empty list");
        return Ok(MappedBatch::default());
    }

    let start = Instant::now();
    let query = build_query(kind, request);
    tracing::info!(
        kind = %kind,
        bbox = %request.bbox,
        limit = request.limit,
        timeout = request.timeout,
        species = ?request.species,
        "Querying Overpass"
    );

    let response = query_with_retry(upstream, &query).await?;
    if response.elements.is_empty() {
        tracing::warn!(kind = %kind, "Overpass returned no elements");
    }

    let batch = map_elements(kind, &response.elements, request.limit as usize, Utc::now());

    tracing::info!(
        kind = %kind,
        received = response.elements.len(),
        processed = batch.processed,
        failed = batch.failed,
        skipped = batch.skipped,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Features mapped"
    );

    Ok(batch)
}

/// Normalize a raw request and run it.
///
/// A request without a bounding box yields an empty batch without touching
/// the upstream service.
///
/// # Errors
///
/// Returns [`Error::InvalidBbox`](crate::Error::InvalidBbox) for a malformed
/// bounding box, or [`Error::Upstream`](crate::Error::Upstream) on query
/// failure.
pub async fn fetch<Q>(upstream: &Q, kind: FeatureKind, request: &FeatureRequest) -> Result<MappedBatch>
where
    Q: UpstreamQuery + ?Sized,
{
    match request.normalize()? {
        Some(normalized) => fetch_features(upstream, kind, &normalized).await,
        None => {
            tracing::warn!(kind = %kind, "No bbox given, returning an empty list");
            Ok(MappedBatch::default())
        }
    }
}

/// Sorted, de-duplicated species of trees and stumps inside `bbox`.
///
/// # Errors
///
/// Returns [`Error::Upstream`](crate::Error::Upstream) if the query still
/// fails after retries.
pub async fn fetch_species<Q>(upstream: &Q, bbox: &BoundingBox) -> Result<Vec<String>>
where
    Q: UpstreamQuery + ?Sized,
{
    let start = Instant::now();
    let query = build_species_query(bbox, SPECIES_QUERY_TIMEOUT);
    tracing::info!(bbox = %bbox, "Querying Overpass for species");

    let response = query_with_retry(upstream, &query).await?;
    let species = collect_species(&response.elements);

    tracing::info!(
        received = response.elements.len(),
        species = species.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Species collected"
    );

    Ok(species)
}

/// Like [`fetch_species`], but never fails: an upstream error or an empty
/// result falls back to [`COMMON_GENERA`].
pub async fn species_or_common<Q>(upstream: &Q, bbox: &BoundingBox) -> Vec<String>
where
    Q: UpstreamQuery + ?Sized,
{
    match fetch_species(upstream, bbox).await {
        Ok(species) if !species.is_empty() => species,
        Ok(_) => {
            tracing::warn!(bbox = %bbox, "No species found, using common genera");
            common_genera()
        }
        Err(e) => {
            tracing::warn!(bbox = %bbox, error = %e, "Species query failed, using common genera");
            common_genera()
        }
    }
}

fn common_genera() -> Vec<String> {
    COMMON_GENERA.iter().map(|s| s.to_string()).collect()
}
