//! Error types for metadata retrieval and flattening.

use thiserror::Error;

/// Errors that can occur while retrieving or decoding instance metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The format selector is neither `ec2` nor `openstack`.
    #[error("unknown metadata format: {0}")]
    UnknownFormat(String),

    /// HTTP error with status code.
    #[error("http {0}")]
    Http(u16),

    /// A public-keys discovery line did not have the `<index>=<label>` form.
    #[error("invalid public key entry: {0}")]
    InvalidPublicKey(String),

    /// An integer metadata field did not parse.
    #[error("invalid integer field: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// JSON deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
