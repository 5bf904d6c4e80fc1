//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Each component is normalized so the verifier on the storage side computes
//! over exactly the same bytes.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::SigningError;

/// SHA-256 of the empty byte sequence, sent as the payload hash of bodiless requests.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// The set of characters that must be percent-encoded in URI components.
///
/// All characters except RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) are encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from its components.
///
/// # Examples
///
/// ```
/// use bucketview_auth::canonical::{EMPTY_PAYLOAD_SHA256, build_canonical_request};
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/images/",
///     "list-type=2",
///     &[("host", "eu-central.object.fastlystorage.app")],
///     &["host"],
///     EMPTY_PAYLOAD_SHA256,
/// )
/// .unwrap();
/// assert!(canonical.starts_with("GET\n/images/\nlist-type=2\n"));
/// ```
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> Result<String, SigningError> {
    let canonical_uri = build_canonical_uri(uri)?;
    let canonical_query = build_canonical_query_string(query_string)?;
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    Ok(format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    ))
}

/// Build the canonical URI by decoding and re-encoding each path segment.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
/// Already-canonical paths come back unchanged.
///
/// # Examples
///
/// ```
/// use bucketview_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/images/").unwrap(), "/images/");
/// assert_eq!(build_canonical_uri("/a b.jpg").unwrap(), "/a%20b.jpg");
/// assert_eq!(build_canonical_uri("").unwrap(), "/");
/// ```
pub fn build_canonical_uri(path: &str) -> Result<String, SigningError> {
    if path.is_empty() || path == "/" {
        return Ok("/".to_owned());
    }

    let encoded_segments = path
        .split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| SigningError::InvalidPath(path.to_owned()))?;
            Ok(uri_encode(&decoded))
        })
        .collect::<Result<Vec<_>, SigningError>>()?;

    Ok(encoded_segments.join("/"))
}

/// Build the canonical query string.
///
/// Each key and value is decoded once and re-encoded with the unreserved
/// set, then parameters are sorted by key and by value for duplicate keys.
/// A parameter without `=` gets an empty value.
///
/// # Examples
///
/// ```
/// use bucketview_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("list-type=2").unwrap(), "list-type=2");
/// assert_eq!(build_canonical_query_string("b=2&a=1").unwrap(), "a=1&b=2");
/// assert_eq!(build_canonical_query_string("lifecycle").unwrap(), "lifecycle=");
/// ```
pub fn build_canonical_query_string(query: &str) -> Result<String, SigningError> {
    if query.is_empty() {
        return Ok(String::new());
    }

    let mut params = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            Ok((normalize_query_component(key)?, normalize_query_component(value)?))
        })
        .collect::<Result<Vec<(String, String)>, SigningError>>()?;

    params.sort_unstable();

    Ok(params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&"))
}

/// Build the canonical headers string from the request headers.
///
/// Only headers listed in `signed_headers` are included. Header names are lowercased,
/// values are trimmed and consecutive spaces are collapsed to a single space.
/// Headers are sorted by name.
///
/// The result does NOT include a trailing newline; the caller adds that as part of
/// the canonical request format.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    // Multiple values for the same name are joined with commas.
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string as a semicolon-separated list of lowercase header names.
///
/// # Examples
///
/// ```
/// use bucketview_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&["x-amz-date", "host", "x-amz-content-sha256"]),
///     "host;x-amz-content-sha256;x-amz-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

fn normalize_query_component(raw: &str) -> Result<String, SigningError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| SigningError::InvalidQuery(raw.to_owned()))?;
    Ok(uri_encode(&decoded))
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};

    use super::*;

    #[test]
    fn test_should_build_canonical_uri_for_bucket_path() {
        assert_eq!(build_canonical_uri("/images/").unwrap(), "/images/");
    }

    #[test]
    fn test_should_normalize_empty_path_to_slash() {
        assert_eq!(build_canonical_uri("").unwrap(), "/");
        assert_eq!(build_canonical_uri("/").unwrap(), "/");
    }

    #[test]
    fn test_should_encode_reserved_characters_but_keep_slashes() {
        assert_eq!(
            build_canonical_uri("/images/summer 2024/a+b(1).jpg").unwrap(),
            "/images/summer%202024/a%2Bb%281%29.jpg"
        );
    }

    #[test]
    fn test_should_be_idempotent_on_canonical_uri() {
        let once = build_canonical_uri("/images/hello world/ü.png").unwrap();
        let twice = build_canonical_uri(&once).unwrap();
        assert_eq!(once, "/images/hello%20world/%C3%BC.png");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_should_not_double_encode_uri_path() {
        assert_eq!(
            build_canonical_uri("/hello%20world").unwrap(),
            "/hello%20world"
        );
        assert_eq!(
            build_canonical_uri("/hello world").unwrap(),
            build_canonical_uri("/hello%20world").unwrap()
        );
    }

    #[test]
    fn test_should_reject_path_that_decodes_to_invalid_utf8() {
        let result = build_canonical_uri("/bad%FF");
        assert!(matches!(result, Err(SigningError::InvalidPath(_))));
    }

    #[test]
    fn test_should_keep_listing_query_unchanged() {
        assert_eq!(
            build_canonical_query_string("list-type=2").unwrap(),
            "list-type=2"
        );
    }

    #[test]
    fn test_should_sort_query_parameters() {
        assert_eq!(
            build_canonical_query_string("prefix=J&max-keys=2").unwrap(),
            "max-keys=2&prefix=J"
        );
    }

    #[test]
    fn test_should_encode_query_keys_and_values() {
        assert_eq!(
            build_canonical_query_string("continuation-token=a/b+c&prefix=summer 2024").unwrap(),
            "continuation-token=a%2Fb%2Bc&prefix=summer%202024"
        );
    }

    #[test]
    fn test_should_not_double_encode_query_values() {
        assert_eq!(
            build_canonical_query_string("prefix=a%2Fb").unwrap(),
            "prefix=a%2Fb"
        );
    }

    #[test]
    fn test_should_sort_duplicate_query_keys_by_value() {
        assert_eq!(
            build_canonical_query_string("k=b&k=a").unwrap(),
            "k=a&k=b"
        );
    }

    #[test]
    fn test_should_return_empty_for_empty_query() {
        assert_eq!(build_canonical_query_string("").unwrap(), "");
    }

    #[test]
    fn test_should_build_canonical_headers_sorted_and_lowercased() {
        let headers = [
            ("X-Amz-Date", "20130524T000000Z"),
            ("Host", "  examplebucket.s3.amazonaws.com "),
            ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256),
        ];
        let signed = ["x-amz-date", "host", "x-amz-content-sha256"];
        let result = build_canonical_headers(&headers, &signed);
        let expected = "host:examplebucket.s3.amazonaws.com\n\
                        x-amz-content-sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
                        x-amz-date:20130524T000000Z";
        assert_eq!(result, expected);
    }

    #[test]
    fn test_should_hardcode_sha256_of_empty_payload() {
        assert_eq!(
            EMPTY_PAYLOAD_SHA256,
            hex::encode(Sha256::digest(b""))
        );
    }

    #[test]
    fn test_should_build_canonical_request_matching_aws_list_objects_example() {
        // AWS test vector: GET /?max-keys=2&prefix=J on examplebucket.
        let headers = [
            ("host", "examplebucket.s3.amazonaws.com"),
            ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256),
            ("x-amz-date", "20130524T000000Z"),
        ];
        let signed_headers = ["host", "x-amz-content-sha256", "x-amz-date"];

        let canonical = build_canonical_request(
            "GET",
            "/",
            "max-keys=2&prefix=J",
            &headers,
            &signed_headers,
            EMPTY_PAYLOAD_SHA256,
        )
        .unwrap();

        let expected = "GET\n\
                        /\n\
                        max-keys=2&prefix=J\n\
                        host:examplebucket.s3.amazonaws.com\n\
                        x-amz-content-sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
                        x-amz-date:20130524T000000Z\n\
                        \n\
                        host;x-amz-content-sha256;x-amz-date\n\
                        e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(canonical, expected);

        let hash = hex::encode(Sha256::digest(canonical.as_bytes()));
        assert_eq!(
            hash,
            "df57d21db20da04d7fa30298dd4488ba3a2b47ca3a489c74750e0f1e7df1b9b7"
        );
    }
}
