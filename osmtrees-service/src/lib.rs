//! osmtrees Service Library
//!
//! HTTP handlers, router and configuration for the trees and stumps service.
//! This library is used by both the osmtrees-service binary and integration tests.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod openapi;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use osmtrees::OverpassClient;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
///
/// Immutable after startup; requests never coordinate through it.
pub struct AppState {
    /// Overpass client used for every feature query.
    pub client: OverpassClient,
    /// Directory holding `robots.txt`.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Build the state from a service configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Overpass HTTP client cannot be created.
    pub fn from_config(config: &ServiceConfig) -> osmtrees::Result<Self> {
        Ok(Self {
            client: OverpassClient::new(config.client.clone())?,
            static_dir: config.static_dir.clone(),
        })
    }
}

/// Build the full application router, middleware included.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .route("/api/trees", get(handlers::get_trees))
        .route("/api/stumps", get(handlers::get_stumps))
        .route("/api/species", get(handlers::get_species))
        .route("/health", get(handlers::health_check))
        .route("/robots.txt", get(handlers::robots_txt))
        .layer(axum::middleware::from_fn(middleware::process_time))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{ErrorResponse, FeatureQuery, HealthResponse, SpeciesQuery, SpeciesResponse};
