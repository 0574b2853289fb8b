//! # osmtrees - Trees and stumps from OpenStreetMap
//!
//! Looks up trees (`natural=tree`) and tree stumps (`natural=tree_stump`)
//! inside a bounding box using the public Overpass API, and normalizes the
//! results into flat [`Tree`] and [`Stump`] records.
//!
//! ## Features
//!
//! - **Load shedding**: the result limit shrinks as the bounding box grows
//! - **Resilient**: gateway timeouts are retried with exponential backoff
//! - **Tolerant**: malformed elements are skipped and counted, never fatal
//! - **Stateless**: one Overpass query per request, nothing cached
//!
//! ## Quick Start
//!
//! ```ignore
//! use osmtrees::{fetch, ClientConfig, FeatureKind, FeatureRequest, OverpassClient};
//!
//! let client = OverpassClient::new(ClientConfig::default())?;
//! let request = FeatureRequest::new("36.61,-6.41,36.64,-6.33").with_limit(800);
//!
//! let batch = fetch(&client, FeatureKind::Tree, &request).await?;
//! println!("{} trees ({} elements failed to map)", batch.features.len(), batch.failed);
//! ```
//!
//! ## Pipeline
//!
//! 1. [`FeatureRequest::normalize`] validates the bbox and derives the
//!    effective limit.
//! 2. [`build_query`] writes the Overpass QL query and
//!    [`query_with_retry`] sends it, retrying gateway timeouts.
//! 3. [`map_elements`] converts raw elements into records.
//!
//! ## Data Source
//!
//! - <https://wiki.openstreetmap.org/wiki/Overpass_API>
//! - <https://wiki.openstreetmap.org/wiki/Tag:natural%3Dtree>

pub mod bbox;
pub mod config;
pub mod error;
#[cfg(feature = "geojson")]
pub mod geojson;
pub mod mapper;
pub mod model;
pub mod overpass;
pub mod pipeline;
pub mod request;
pub mod retry;

// Re-export main types at crate root for convenience
pub use bbox::BoundingBox;
pub use config::ClientConfig;
pub use error::{BboxError, Error, MappingError, Result, UpstreamError};
pub use mapper::{collect_species, map_elements, MappedBatch};
pub use model::{Feature, FeatureKind, Stump, Tree};
pub use overpass::{
    build_query, build_species_query, query_with_retry, OverpassClient, OverpassResponse,
    UpstreamQuery,
};
pub use pipeline::{fetch, fetch_features, fetch_species, species_or_common, COMMON_GENERA};
pub use request::{FeatureRequest, NormalizedRequest};
pub use retry::RetryPolicy;
