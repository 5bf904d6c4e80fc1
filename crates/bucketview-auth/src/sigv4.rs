//! AWS Signature Version 4 signing.
//!
//! Signing runs in three steps:
//!
//! 1. Build the string to sign from the timestamp, credential scope, and the
//!    SHA-256 of the canonical request.
//! 2. Derive the signing key with four chained HMAC-SHA256 rounds keyed from
//!    the secret key. Intermediate keys stay raw bytes.
//! 3. HMAC the string to sign with the signing key and hex-encode the result.
//!
//! The main entry point is [`sign`].

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;
use crate::error::SigningError;

/// The only algorithm produced by this implementation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Terminator of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

/// `x-amz-date` format: ISO-8601 basic, UTC, second precision.
const LONG_DATE: &str = "%Y%m%dT%H%M%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Per-request signing inputs derived from a single clock reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    /// Timestamp in `YYYYMMDDTHHMMSSZ` form.
    pub timestamp: String,
    /// The first eight characters of `timestamp`.
    pub date: String,
    /// Region of the credential scope.
    pub region: String,
    /// Service of the credential scope.
    pub service: String,
}

impl SigningContext {
    /// Create a context for a request sent at `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketview_auth::{Credentials, sigv4::SigningContext};
    /// use chrono::{TimeZone, Utc};
    ///
    /// let creds = Credentials::new("AKID", "secret", "eu-central");
    /// let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    /// let ctx = SigningContext::new(now, &creds);
    /// assert_eq!(ctx.timestamp, "20240309T070501Z");
    /// assert_eq!(ctx.date, "20240309");
    /// ```
    #[must_use]
    pub fn new(now: DateTime<Utc>, credentials: &Credentials) -> Self {
        let timestamp = now.format(LONG_DATE).to_string();
        let date = timestamp[..8].to_owned();
        Self {
            timestamp,
            date,
            region: credentials.region().to_owned(),
            service: credentials.service().to_owned(),
        }
    }

    /// The `date/region/service/aws4_request` scope of this context.
    #[must_use]
    pub fn scope(&self) -> String {
        credential_scope(&self.date, &self.region, &self.service)
    }
}

/// Build the credential scope string.
///
/// # Examples
///
/// ```
/// use bucketview_auth::sigv4::credential_scope;
///
/// assert_eq!(
///     credential_scope("20130524", "us-east-1", "s3"),
///     "20130524/us-east-1/s3/aws4_request"
/// );
/// ```
#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// Every intermediate key is fed to the next round as raw bytes.
pub fn derive_signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let date_region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes())?;
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data` with `signing_key`.
pub fn compute_signature(signing_key: &[u8], data: &str) -> Result<String, SigningError> {
    hmac_sha256(signing_key, data.as_bytes()).map(hex::encode)
}

/// Sign a canonical request, returning the lowercase hex signature.
///
/// # Examples
///
/// ```
/// use bucketview_auth::{Credentials, sigv4::{SigningContext, sign}};
/// use chrono::{TimeZone, Utc};
///
/// let creds = Credentials::new("AKID", "secret", "eu-central");
/// let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
/// let signature = sign("GET\n/\n\n\n\n\n", &SigningContext::new(now, &creds), &creds).unwrap();
/// assert_eq!(signature.len(), 64);
/// ```
pub fn sign(
    canonical_request: &str,
    context: &SigningContext,
    credentials: &Credentials,
) -> Result<String, SigningError> {
    let canonical_hash = hash_payload(canonical_request.as_bytes());
    let string_to_sign =
        build_string_to_sign(&context.timestamp, &context.scope(), &canonical_hash);

    tracing::debug!(string_to_sign = %string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(
        credentials.secret_access_key(),
        &context.date,
        &context.region,
        &context.service,
    )?;
    compute_signature(&signing_key, &string_to_sign)
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use bucketview_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SigningError::Hmac(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
