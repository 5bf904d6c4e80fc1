//! Error types for SigV4 request signing.
//!
//! Every failure while signing is fatal to the request: callers must never
//! send a request whose signing returned an error.

/// Errors that can occur while signing a request with AWS Signature Version 4.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The request path decodes to bytes that are not valid UTF-8.
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// A query parameter decodes to bytes that are not valid UTF-8.
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),

    /// The request URI has no authority to derive the `host` header from.
    #[error("request URI has no host: {0}")]
    MissingHost(String),

    /// A computed header value cannot be represented as an HTTP header.
    #[error("invalid header value for {0}")]
    InvalidHeaderValue(&'static str),

    /// The HMAC primitive rejected its key.
    #[error("HMAC-SHA256 failure: {0}")]
    Hmac(String),
}
