//! Error types for the osmtrees library.

use thiserror::Error;

/// Errors raised while parsing a bounding box string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BboxError {
    /// The string did not contain exactly four comma-separated components.
    #[error("Invalid bbox '{input}': expected 4 comma-separated values (min_lat,min_lon,max_lat,max_lon), found {found}")]
    ComponentCount { input: String, found: usize },

    /// A component could not be parsed as a number.
    #[error("Invalid bbox '{input}': '{component}' is not a number")]
    InvalidNumber { input: String, component: String },

    /// A component parsed to NaN or infinity.
    #[error("Invalid bbox '{input}': coordinates must be finite")]
    NonFinite { input: String },
}

/// Failures talking to the Overpass API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The request did not complete within the client timeout.
    #[error("Timeout querying Overpass API")]
    Timeout,

    /// Overpass answered with a non-success HTTP status.
    #[error("Overpass API returned HTTP {status}")]
    Status { status: u16 },

    /// No connection could be established.
    #[error("Could not connect to Overpass API: {message}")]
    Unreachable { message: String },

    /// Any other failure, including an undecodable response body.
    #[error("Unexpected error querying Overpass API: {message}")]
    Unexpected { message: String },
}

impl UpstreamError {
    /// HTTP status Overpass uses for a gateway timeout.
    pub const GATEWAY_TIMEOUT: u16 = 504;

    /// Whether this failure is a gateway timeout, the only class worth retrying.
    pub fn is_gateway_timeout(&self) -> bool {
        match self {
            UpstreamError::Timeout => true,
            UpstreamError::Status { status } => *status == Self::GATEWAY_TIMEOUT,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if let Some(status) = e.status() {
            UpstreamError::Status {
                status: status.as_u16(),
            }
        } else if e.is_connect() || e.is_request() {
            UpstreamError::Unreachable {
                message: e.to_string(),
            }
        } else {
            UpstreamError::Unexpected {
                message: e.to_string(),
            }
        }
    }
}

/// Why a single upstream element could not become a record.
///
/// These never abort a request; the mapper counts and skips them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The element carries no numeric id.
    #[error("element has no id")]
    MissingId,

    /// The element has neither `lat`/`lon` nor a `center`.
    #[error("element {id} has no position")]
    MissingPosition { id: u64 },
}

/// Errors that can occur while serving a feature request.
#[derive(Error, Debug)]
pub enum Error {
    /// The bounding box parameter was malformed.
    #[error(transparent)]
    InvalidBbox(#[from] BboxError),

    /// The upstream query failed after retries.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The HTTP client could not be built from the configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
