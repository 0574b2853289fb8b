//! HTTP request handlers for the trees and stumps service.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use osmtrees::{BoundingBox, Error, FeatureKind, FeatureRequest, UpstreamError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Served when no `robots.txt` exists in the static directory.
pub const DEFAULT_ROBOTS_TXT: &str = "User-agent: *\nDisallow:";

/// Area searched by `/api/species` when no `bbox` is given (Rota, Cádiz).
pub const DEFAULT_SPECIES_BBOX: &str =
    "36.613770852449,-6.410994529724,36.641667904189,-6.328597068787";

/// Query parameters shared by the feature endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeatureQuery {
    /// Bounding box as `min_lat,min_lon,max_lat,max_lon`.
    /// Without it the response is an empty list.
    pub bbox: Option<String>,
    /// Maximum number of results. Default 500, capped at 1000 and further
    /// reduced for large areas.
    pub limit: Option<i64>,
    /// Overpass server-side timeout setting. Default 6000.
    pub timeout: Option<u32>,
    /// Only return features with this exact species tag.
    pub species: Option<String>,
}

impl From<FeatureQuery> for FeatureRequest {
    fn from(query: FeatureQuery) -> Self {
        FeatureRequest {
            bbox: query.bbox,
            limit: query.limit,
            timeout: query.timeout,
            species: query.species,
        }
    }
}

/// Query parameters for the species endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SpeciesQuery {
    /// Bounding box as `min_lat,min_lon,max_lat,max_lon`.
    /// Defaults to the centre of Rota.
    pub bbox: Option<String>,
}

/// Species list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SpeciesResponse {
    /// Sorted, de-duplicated species names.
    pub species: Vec<String>,
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// HTTP status for a pipeline error.
///
/// - invalid bbox → `400 Bad Request`
/// - timeout or upstream `504` → `504 Gateway Timeout`
/// - other upstream status → `502 Bad Gateway`
/// - upstream unreachable → `503 Service Unavailable`
/// - anything else → `500 Internal Server Error`
pub fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidBbox(_) => StatusCode::BAD_REQUEST,
        Error::Upstream(upstream) if upstream.is_gateway_timeout() => StatusCode::GATEWAY_TIMEOUT,
        Error::Upstream(UpstreamError::Status { .. }) => StatusCode::BAD_GATEWAY,
        Error::Upstream(UpstreamError::Unreachable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Upstream(_) | Error::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Create an error response for feature queries.
fn error_response(kind: FeatureKind, e: Error) -> Response {
    let status = status_for(&e);
    if status.is_client_error() {
        tracing::warn!(kind = %kind, error = %e, "Rejected feature query");
    } else {
        tracing::error!(kind = %kind, status = status.as_u16(), error = %e, "Feature query failed");
    }

    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// Shared body of the feature endpoints.
async fn features(
    state: &AppState,
    kind: FeatureKind,
    query: Result<Query<FeatureQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            tracing::warn!(kind = %kind, error = %rejection, "Invalid query parameters");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    tracing::debug!(
        kind = %kind,
        bbox = ?query.bbox,
        limit = ?query.limit,
        timeout = ?query.timeout,
        "Feature query"
    );

    match osmtrees::fetch(&state.client, kind, &FeatureRequest::from(query)).await {
        Ok(batch) => (StatusCode::OK, Json(batch.features)).into_response(),
        Err(e) => error_response(kind, e),
    }
}

/// Get trees inside a bounding box.
///
/// # Returns
///
/// - `200 OK` with a JSON array of trees (empty when `bbox` is missing)
/// - `400 Bad Request` if `bbox` or another parameter is malformed
/// - `502`/`503`/`504` if Overpass fails after retries
#[utoipa::path(
    get,
    path = "/api/trees",
    tag = "features",
    params(FeatureQuery),
    responses(
        (status = 200, description = "Trees inside the bounding box", body = Vec<osmtrees::Tree>),
        (status = 400, description = "Malformed parameters", body = ErrorResponse),
        (status = 502, description = "Overpass returned an error", body = ErrorResponse),
        (status = 503, description = "Overpass unreachable", body = ErrorResponse),
        (status = 504, description = "Overpass timed out", body = ErrorResponse)
    )
)]
pub async fn get_trees(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeatureQuery>, QueryRejection>,
) -> Response {
    features(&state, FeatureKind::Tree, query).await
}

/// Get tree stumps inside a bounding box.
///
/// Same parameters and status codes as [`get_trees`].
#[utoipa::path(
    get,
    path = "/api/stumps",
    tag = "features",
    params(FeatureQuery),
    responses(
        (status = 200, description = "Stumps inside the bounding box", body = Vec<osmtrees::Stump>),
        (status = 400, description = "Malformed parameters", body = ErrorResponse),
        (status = 502, description = "Overpass returned an error", body = ErrorResponse),
        (status = 503, description = "Overpass unreachable", body = ErrorResponse),
        (status = 504, description = "Overpass timed out", body = ErrorResponse)
    )
)]
pub async fn get_stumps(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeatureQuery>, QueryRejection>,
) -> Response {
    features(&state, FeatureKind::Stump, query).await
}

/// List the species tagged on trees and stumps in an area.
///
/// Falls back to a list of common genera when Overpass fails or finds
/// nothing, so upstream trouble never turns into an error here.
#[utoipa::path(
    get,
    path = "/api/species",
    tag = "features",
    params(SpeciesQuery),
    responses(
        (status = 200, description = "Species names", body = SpeciesResponse),
        (status = 400, description = "Malformed parameters", body = ErrorResponse)
    )
)]
pub async fn get_species(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SpeciesQuery>, QueryRejection>,
) -> Response {
    let raw = match query {
        Ok(Query(query)) => query
            .bbox
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SPECIES_BBOX.to_string()),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Invalid query parameters");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    let bbox = match BoundingBox::parse(&raw) {
        Ok(bbox) => bbox,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected species query");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: Error::from(e).to_string(),
                }),
            )
                .into_response();
        }
    };

    let species = osmtrees::species_or_common(&state.client, &bbox).await;
    (StatusCode::OK, Json(SpeciesResponse { species })).into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Serve `robots.txt` from the static directory, with a permissive fallback.
pub async fn robots_txt(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let path = state.static_dir.join("robots.txt");
    let body = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Could not read robots.txt");
            }
            DEFAULT_ROBOTS_TXT.to_string()
        }
    };

    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}
