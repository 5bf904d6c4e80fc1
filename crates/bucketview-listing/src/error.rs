//! Error types for bucket listing.

use bucketview_auth::SigningError;

/// Errors that can occur while listing a bucket.
///
/// None of these are retried; the caller decides how to degrade.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// The listing request could not be signed, so it was never sent.
    #[error("failed to sign listing request: {0}")]
    Signing(#[from] SigningError),

    /// The listing request could not be built from the configured endpoint.
    #[error("invalid listing request: {0}")]
    Request(#[from] http::Error),

    /// The HTTP client failed to send the request or read the response.
    #[error("object storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The object store answered with a non-2xx status.
    #[error("Failed to list objects: {status} {reason}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status, if any.
        reason: String,
    },

    /// The listing body is not well-formed XML.
    #[error("XML processing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Text inside a `<Key>` element could not be decoded.
    #[error("invalid key text: {0}")]
    InvalidKey(String),
}
