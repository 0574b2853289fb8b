//! Overpass API query building and transport.
//!
//! This module turns a [`NormalizedRequest`] into an Overpass QL query and
//! sends it to an Overpass interpreter endpoint.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::bbox::BoundingBox;
use crate::config::ClientConfig;
use crate::error::{Error, Result, UpstreamError};
use crate::model::FeatureKind;
use crate::request::NormalizedRequest;
use crate::retry::{retry_gateway_timeouts, RetryPolicy};

/// Overpass JSON response body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OverpassResponse {
    /// Matching map elements.
    #[serde(default, deserialize_with = "lenient_elements")]
    pub elements: Vec<Element>,
}

/// A single raw Overpass element.
///
/// Only the fields the mapper needs are modelled; anything else is ignored.
/// A field with an unexpected JSON type decodes as absent, so a single bad
/// element surfaces as a mapping failure instead of failing the response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Element {
    /// Element type: `"node"`, `"way"` or `"relation"`.
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub element_type: String,
    /// OSM id.
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u64>,
    /// Latitude (nodes only).
    #[serde(default, deserialize_with = "lenient")]
    pub lat: Option<f64>,
    /// Longitude (nodes only).
    #[serde(default, deserialize_with = "lenient")]
    pub lon: Option<f64>,
    /// Centroid emitted by `out center` for non-node elements.
    #[serde(default, deserialize_with = "lenient")]
    pub center: Option<Center>,
    /// Free-form OSM tags. Values are usually strings but are not trusted to be.
    #[serde(default, deserialize_with = "lenient")]
    pub tags: HashMap<String, serde_json::Value>,
}

/// Decode `T`, falling back to its default when the JSON value has the
/// wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Decode the element list one entry at a time. Entries that are not JSON
/// objects become default elements, which the mapper skips as non-nodes.
fn lenient_elements<'de, D>(deserializer: D) -> std::result::Result<Vec<Element>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<serde_json::Value> = lenient(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| Element::deserialize(value).unwrap_or_default())
        .collect())
}

impl Element {
    /// Whether this element is a point node.
    pub fn is_node(&self) -> bool {
        self.element_type == "node"
    }
}

/// A `center` position.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// Escape a value for use inside a double-quoted Overpass QL string.
fn escape_ql(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Build the Overpass QL query selecting `kind` nodes inside the request bbox.
///
/// Trees ask for `out center` so that every element carries a position.
///
/// # Example
///
/// ```ignore
/// let query = build_query(FeatureKind::Stump, &request);
/// // [out:json][timeout:6000];
/// // (
/// //   node["natural"="tree_stump"](36.61,-6.41,36.64,-6.33);
/// // );
/// // out 500;
/// ```
pub fn build_query(kind: FeatureKind, request: &NormalizedRequest) -> String {
    let species_filter = request
        .species
        .as_deref()
        .map(|s| format!("[\"species\"=\"{}\"]", escape_ql(s)))
        .unwrap_or_default();
    let out = match kind {
        FeatureKind::Tree => "out center",
        FeatureKind::Stump => "out",
    };

    format!(
        "[out:json][timeout:{timeout}];\n(\n  node[\"natural\"=\"{tag}\"]{species}({bbox});\n);\n{out} {limit};\n",
        timeout = request.timeout,
        tag = kind.osm_tag(),
        species = species_filter,
        bbox = request.bbox,
        out = out,
        limit = request.limit,
    )
}

/// Build the query listing every tree and stump inside `bbox` that carries
/// a `species` tag.
pub fn build_species_query(bbox: &BoundingBox, timeout: u32) -> String {
    let mut query = format!("[out:json][timeout:{}];\n(\n", timeout);
    for kind in [FeatureKind::Tree, FeatureKind::Stump] {
        query.push_str(&format!(
            "  node[\"natural\"=\"{}\"][\"species\"]({});\n",
            kind.osm_tag(),
            bbox
        ));
    }
    query.push_str(");\nout;\n");
    query
}

/// Something that can run an Overpass QL query.
///
/// [`OverpassClient`] is the production implementation; tests substitute
/// scripted doubles.
#[async_trait]
pub trait UpstreamQuery: Send + Sync {
    /// Run `query` once, without retrying.
    async fn run_query(&self, query: &str) -> std::result::Result<OverpassResponse, UpstreamError>;

    /// Retry policy to apply around [`run_query`](Self::run_query).
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

/// Run `query` against `upstream`, retrying gateway timeouts per its policy.
pub async fn query_with_retry<Q>(
    upstream: &Q,
    query: &str,
) -> std::result::Result<OverpassResponse, UpstreamError>
where
    Q: UpstreamQuery + ?Sized,
{
    let policy = upstream.retry_policy();
    retry_gateway_timeouts(&policy, |_| upstream.run_query(query)).await
}

/// HTTP client for an Overpass interpreter endpoint.
///
/// Cheap to share: the inner [`reqwest::Client`] pools connections.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    config: ClientConfig,
}

impl OverpassClient {
    /// Create a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built
    /// (e.g. TLS backend initialization failure).
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Overpass endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl UpstreamQuery for OverpassClient {
    async fn run_query(&self, query: &str) -> std::result::Result<OverpassResponse, UpstreamError> {
        let start = Instant::now();
        tracing::debug!(
            endpoint = %self.config.endpoint,
            query_len = query.len(),
            "Sending Overpass query"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| {
                let err = UpstreamError::from(e);
                tracing::error!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "Overpass request failed"
                );
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            tracing::error!(
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                body = %snippet,
                "Overpass returned an error status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        // A timeout while the body is still streaming is an upstream timeout
        let parsed: OverpassResponse = response.json().await.map_err(|e| {
            let err = if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Unexpected {
                    message: format!("invalid Overpass response: {}", e),
                }
            };
            tracing::error!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                error = %err,
                "Failed to read Overpass response"
            );
            err
        })?;

        tracing::info!(
            elements = parsed.elements.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Overpass query succeeded"
        );

        Ok(parsed)
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.config.retry.clone()
    }
}
