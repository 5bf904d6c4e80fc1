//! Stamping outgoing requests with SigV4 authentication headers.
//!
//! [`Authorizer`] reads the clock once per request and uses that single
//! timestamp for both the canonical headers and the `x-amz-date` header. The
//! `host` value that gets signed is the exact value inserted into the request.

use chrono::{DateTime, Utc};
use http::HeaderValue;
use http::header::{AUTHORIZATION, HOST, HeaderName};
use tracing::debug;

use crate::canonical::{
    EMPTY_PAYLOAD_SHA256, build_canonical_request, build_signed_headers_string,
};
use crate::credentials::Credentials;
use crate::error::SigningError;
use crate::sigv4::{ALGORITHM, SigningContext, sign};

/// Header carrying the request timestamp.
pub const X_AMZ_DATE: HeaderName = HeaderName::from_static("x-amz-date");

/// Header carrying the payload hash.
pub const X_AMZ_CONTENT_SHA256: HeaderName = HeaderName::from_static("x-amz-content-sha256");

/// The fixed set of headers covered by every signature, in canonical order.
pub const SIGNED_HEADERS: [&str; 3] = ["host", "x-amz-content-sha256", "x-amz-date"];

/// Signs outgoing requests with a fixed set of credentials.
#[derive(Debug, Clone)]
pub struct Authorizer {
    credentials: Credentials,
}

impl Authorizer {
    /// Create an authorizer for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Sign `request` as of the current time.
    pub fn authorize<B>(&self, request: &mut http::Request<B>) -> Result<(), SigningError> {
        self.authorize_at(request, Utc::now())
    }

    /// Sign `request` as of `now`, inserting `host`, `x-amz-date`,
    /// `x-amz-content-sha256` and `authorization`.
    ///
    /// On error the request is left untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketview_auth::{Authorizer, Credentials};
    /// use chrono::{TimeZone, Utc};
    ///
    /// let authorizer = Authorizer::new(Credentials::new("AKID", "secret", "eu-central"));
    /// let mut request = http::Request::get("https://eu-central.object.fastlystorage.app/images/?list-type=2")
    ///     .body(())
    ///     .unwrap();
    /// let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    /// authorizer.authorize_at(&mut request, now).unwrap();
    ///
    /// assert_eq!(request.headers()["host"], "eu-central.object.fastlystorage.app");
    /// assert_eq!(request.headers()["x-amz-date"], "20240309T070501Z");
    /// ```
    pub fn authorize_at<B>(
        &self,
        request: &mut http::Request<B>,
        now: DateTime<Utc>,
    ) -> Result<(), SigningError> {
        let context = SigningContext::new(now, &self.credentials);
        let host = host_from_uri(request.uri())?;

        let canonical_headers = [
            ("host", host.as_str()),
            ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256),
            ("x-amz-date", context.timestamp.as_str()),
        ];
        let canonical_request = build_canonical_request(
            request.method().as_str(),
            request.uri().path(),
            request.uri().query().unwrap_or(""),
            &canonical_headers,
            &SIGNED_HEADERS,
            EMPTY_PAYLOAD_SHA256,
        )?;

        debug!(canonical_request = %canonical_request, "Built canonical request");

        let signature = sign(&canonical_request, &context, &self.credentials)?;
        let authorization = format!(
            "{ALGORITHM} Credential={}/{},SignedHeaders={},Signature={signature}",
            self.credentials.access_key_id(),
            context.scope(),
            build_signed_headers_string(&SIGNED_HEADERS),
        );

        debug!(
            access_key_id = %self.credentials.access_key_id(),
            host = %host,
            x_amz_date = %context.timestamp,
            "Signed request"
        );

        let host = header_value("host", &host)?;
        let date = header_value("x-amz-date", &context.timestamp)?;
        let authorization = header_value("authorization", &authorization)?;

        let headers = request.headers_mut();
        headers.insert(HOST, host);
        headers.insert(
            X_AMZ_CONTENT_SHA256,
            HeaderValue::from_static(EMPTY_PAYLOAD_SHA256),
        );
        headers.insert(X_AMZ_DATE, date);
        headers.insert(AUTHORIZATION, authorization);

        Ok(())
    }
}

/// Derive the `host` header value from the URI authority.
///
/// The port is kept only when the URI spells it out, matching what an HTTP
/// client puts on the wire.
fn host_from_uri(uri: &http::Uri) -> Result<String, SigningError> {
    let authority = uri
        .authority()
        .ok_or_else(|| SigningError::MissingHost(uri.to_string()))?;

    Ok(match authority.port_u16() {
        Some(port) => format!("{}:{port}", authority.host()),
        None => authority.host().to_owned(),
    })
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, SigningError> {
    HeaderValue::from_str(value).map_err(|_| SigningError::InvalidHeaderValue(name))
}
