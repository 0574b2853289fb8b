//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::handlers;

/// OpenAPI documentation for the osmtrees service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "osmtrees Service",
        description = "Trees and tree stumps from OpenStreetMap, queried through the Overpass API.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_trees,
        handlers::get_stumps,
        handlers::get_species,
        handlers::health_check,
    ),
    components(
        schemas(
            osmtrees::Tree,
            osmtrees::Stump,
            handlers::SpeciesResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
        )
    ),
    tags(
        (name = "features", description = "Tree and stump queries"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;
