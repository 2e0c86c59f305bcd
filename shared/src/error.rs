//! Error taxonomy shared by the client and the server.

use thiserror::Error;

/// Failure to load the feature collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-2xx response.
    #[error("HTTP {0}")]
    Status(u16),

    /// The request never produced a response.
    #[error("fetch error: {0}")]
    Network(String),

    /// The body was not a usable GeoJSON feature collection.
    #[error("parse error: {0}")]
    Decode(String),
}

/// Recoverable map-level failures surfaced to the page shell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("failed to load map data: {0}")]
    Fetch(#[from] FetchError),

    /// Search text did not name a region exactly (case-insensitive).
    #[error("no region named {query:?}")]
    NotFound { query: String },
}

/// Failure to interpret a GeoJSON document as a region collection.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    #[error("expected a FeatureCollection, got a {0}")]
    NotFeatureCollection(&'static str),
}

impl From<DatasetError> for FetchError {
    fn from(err: DatasetError) -> Self {
        FetchError::Decode(err.to_string())
    }
}
