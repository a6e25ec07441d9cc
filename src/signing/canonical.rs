//! Canonical request building for AWS Signature V4.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::{BTreeMap, BTreeSet};

/// Characters that should NOT be percent-encoded in URI paths.
const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Characters that should NOT be percent-encoded in query strings.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URI-encode an object key for use as a URL path.
pub fn uri_encode_path(path: &str) -> String {
    utf8_percent_encode(path, URI_PATH_SET).to_string()
}

/// URI-encode a query parameter for canonical requests.
pub fn uri_encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SET).to_string()
}

/// Build the canonical URI from an already-encoded URL path.
///
/// S3 paths are encoded once, so the path is used as sent.
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Build the canonical query string.
///
/// Each parameter is decoded, re-encoded strictly, and the result sorted by
/// name then value. A bare marker such as `uploads` becomes `uploads=`.
pub fn build_canonical_query_string(query_string: &str) -> String {
    if query_string.is_empty() {
        return String::new();
    }

    let canonical = |s: &str| uri_encode_query(&percent_decode_str(s).decode_utf8_lossy());

    let mut params: Vec<(String, String)> = query_string
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            (canonical(key), canonical(value))
        })
        .collect();

    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string.
///
/// Headers are lowercased, trimmed, sorted by name, and joined with newlines.
/// Multiple values for the same header are comma-separated.
pub fn build_canonical_headers(headers: &[(String, String)]) -> String {
    let mut header_map: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, value) in headers {
        let name_lower = name.to_lowercase();
        if !super::should_sign_header(&name_lower) {
            continue;
        }

        let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
        header_map.entry(name_lower).or_default().push(trimmed);
    }

    header_map
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

/// Build the signed headers string.
///
/// Returns a semicolon-separated list of lowercase header names.
pub fn build_signed_headers(headers: &[(String, String)]) -> String {
    let names: BTreeSet<String> = headers
        .iter()
        .map(|(name, _)| name.to_lowercase())
        .filter(|name| super::should_sign_header(name))
        .collect();

    names.into_iter().collect::<Vec<_>>().join(";")
}

/// Build the canonical request string.
///
/// Format:
/// ```text
/// HTTPMethod\n
/// CanonicalURI\n
/// CanonicalQueryString\n
/// CanonicalHeaders\n
/// SignedHeaders\n
/// HashedPayload
/// ```
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        build_canonical_uri(uri),
        build_canonical_query_string(query_string),
        build_canonical_headers(headers),
        build_signed_headers(headers),
        payload_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode_path() {
        assert_eq!(uri_encode_path("foo/bar"), "foo/bar");
        assert_eq!(uri_encode_path("foo bar/baz"), "foo%20bar/baz");
        assert_eq!(uri_encode_path("a+b=c"), "a%2Bb%3Dc");
    }

    #[test]
    fn test_uri_encode_query() {
        assert_eq!(uri_encode_query("foo"), "foo");
        assert_eq!(uri_encode_query("foo bar"), "foo%20bar");
        assert_eq!(uri_encode_query("foo=bar"), "foo%3Dbar");
    }

    #[test]
    fn test_canonical_uri_is_not_reencoded() {
        assert_eq!(build_canonical_uri(""), "/");
        assert_eq!(build_canonical_uri("/b/my%20file"), "/b/my%20file");
        assert_eq!(build_canonical_uri("k"), "/k");
    }

    #[test]
    fn test_build_canonical_query_string() {
        assert_eq!(build_canonical_query_string(""), "");
        assert_eq!(build_canonical_query_string("uploads"), "uploads=");
        assert_eq!(
            build_canonical_query_string("uploadId=a%2Bb&partNumber=2"),
            "partNumber=2&uploadId=a%2Bb"
        );
        assert_eq!(build_canonical_query_string("a=2&a=1"), "a=1&a=2");
    }

    #[test]
    fn test_unencoded_query_values_are_encoded() {
        assert_eq!(
            build_canonical_query_string("uploadId=x y/z"),
            "uploadId=x%20y%2Fz"
        );
    }

    #[test]
    fn test_build_signed_headers() {
        let headers = vec![
            ("Host".to_string(), "example.com".to_string()),
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
            ("Content-Type".to_string(), "application/xml".to_string()),
            ("User-Agent".to_string(), "test".to_string()),
        ];

        assert_eq!(
            build_signed_headers(&headers),
            "content-type;host;x-amz-date"
        );
    }

    #[test]
    fn test_headers_whitespace_normalization() {
        let headers = vec![
            ("Host".to_string(), "  example.com  ".to_string()),
            ("X-Amz-Meta-Test".to_string(), "value  with   spaces".to_string()),
        ];

        let result = build_canonical_headers(&headers);
        assert_eq!(
            result,
            "host:example.com\nx-amz-meta-test:value with spaces\n"
        );
    }
}
