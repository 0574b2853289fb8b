//! osmtrees Service - HTTP microservice for OpenStreetMap trees and stumps.
//!
//! Proxies bounding-box queries to the Overpass API and returns flat JSON
//! records.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OSMTREES_PORT` | HTTP server port | `PORT`, then 8000 |
//! | `PORT` | HTTP server port (hosting platforms) | 8000 |
//! | `OSMTREES_OVERPASS_URL` | Overpass interpreter endpoint | `https://overpass-api.de/api/interpreter` |
//! | `OSMTREES_MAX_RETRIES` | Retries after an Overpass gateway timeout | 2 |
//! | `OSMTREES_STATIC_DIR` | Directory holding `robots.txt` | `static` |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /api/trees?bbox=...&limit=N&timeout=N&species=S` - Trees in a bounding box
//! - `GET /api/stumps?bbox=...&limit=N&timeout=N&species=S` - Stumps in a bounding box
//! - `GET /api/species?bbox=...` - Species tagged in an area (common genera as fallback)
//! - `GET /health` - Health check
//! - `GET /robots.txt` - Crawler rules
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use osmtrees_service::{app, config::ServiceConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osmtrees=info,osmtrees_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let state = Arc::new(AppState::from_config(&config)?);

    tracing::info!(
        overpass_url = %config.client.endpoint,
        max_retries = config.client.retry.max_retries,
        static_dir = %config.static_dir.display(),
        port = config.port,
        "Starting osmtrees service"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
