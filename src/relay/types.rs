//! Descriptor and summary types exchanged with callers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use axum::http::HeaderMap;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::relay::error::RelayError;

/// The caller's description of the outbound call to perform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RequestDescriptor {
    pub method: String,

    pub url: String,

    /// Single-valued: a repeated key keeps only its last value.
    pub headers: HashMap<String, String>,
}

impl RequestDescriptor {
    /// Decode the first JSON value in `body` and check the required fields.
    ///
    /// Anything after the first value is ignored, as are unknown fields.
    pub fn decode(body: &[u8]) -> Result<Self, RelayError> {
        let descriptor = serde_json::Deserializer::from_slice(body)
            .into_iter::<RequestDescriptor>()
            .next()
            .ok_or_else(|| RelayError::InvalidInput("empty body".to_string()))?
            .map_err(|e| RelayError::InvalidInput(e.to_string()))?;

        if descriptor.method.is_empty() {
            return Err(RelayError::InvalidInput("method is empty".to_string()));
        }
        if descriptor.url.is_empty() {
            return Err(RelayError::InvalidInput("url is empty".to_string()));
        }
        Ok(descriptor)
    }
}

/// Field names match case-insensitively and a later match overwrites an
/// earlier one. `null` leaves `method`/`url` untouched and clears
/// `headers`; a repeated `headers` object merges into the previous one.
impl<'de> Deserialize<'de> for RequestDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DescriptorVisitor)
    }
}

struct DescriptorVisitor;

impl<'de> Visitor<'de> for DescriptorVisitor {
    type Value = RequestDescriptor;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a request descriptor object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut descriptor = RequestDescriptor::default();

        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("method") {
                if let Some(method) = map.next_value::<Option<String>>()? {
                    descriptor.method = method;
                }
            } else if key.eq_ignore_ascii_case("url") {
                if let Some(url) = map.next_value::<Option<String>>()? {
                    descriptor.url = url;
                }
            } else if key.eq_ignore_ascii_case("headers") {
                match map.next_value::<Option<HashMap<String, String>>>()? {
                    Some(headers) => descriptor.headers.extend(headers),
                    None => descriptor.headers.clear(),
                }
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }

        Ok(descriptor)
    }
}

/// Outcome of one relayed call as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSummary {
    /// Key under which the originating descriptor was stored.
    pub id: String,
    pub status: u16,
    /// Canonical header name → values in the order received.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Byte count of the upstream body.
    pub length: u64,
}

/// Group response headers by canonical name, keeping per-name value order.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut collected: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        collected
            .entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collected
}

/// `content-type` → `Content-Type`, `x-request-id` → `X-Request-Id`.
///
/// Names containing bytes outside the header token set are returned as-is.
pub fn canonical_header_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_decode_full_descriptor() {
        let d = RequestDescriptor::decode(
            br#"{"method":"GET","url":"http://example.test/ok","headers":{"X-Test":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(d.method, "GET");
        assert_eq!(d.url, "http://example.test/ok");
        assert_eq!(d.headers.get("X-Test").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_decode_missing_or_null_headers() {
        let d = RequestDescriptor::decode(br#"{"method":"GET","url":"http://x"}"#).unwrap();
        assert!(d.headers.is_empty());

        let d = RequestDescriptor::decode(br#"{"method":"GET","url":"http://x","headers":null}"#)
            .unwrap();
        assert!(d.headers.is_empty());
    }

    #[test]
    fn test_decode_rejects_empty_method_or_url() {
        for body in [
            &br#"{"method":"","url":"http://x"}"#[..],
            br#"{"url":"http://x"}"#,
            br#"{"method":null,"url":"http://x"}"#,
            br#"{"method":"GET","url":""}"#,
            br#"{"method":"GET"}"#,
        ] {
            assert!(matches!(
                RequestDescriptor::decode(body),
                Err(RelayError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_decode_rejects_malformed_bodies() {
        for body in [
            &b""[..],
            b"   ",
            b"not json",
            b"[1,2]",
            br#"{"method":1,"url":"http://x"}"#,
            br#"{"method":"GET","url":"http://x","headers":{"a":1}}"#,
        ] {
            assert!(
                matches!(RequestDescriptor::decode(body), Err(RelayError::InvalidInput(_))),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_decode_ignores_trailing_data_and_unknown_fields() {
        let d = RequestDescriptor::decode(
            br#"{"method":"POST","url":"http://x","body":"dropped"} trailing garbage"#,
        )
        .unwrap();
        assert_eq!(d.method, "POST");
    }

    #[test]
    fn test_repeated_header_key_keeps_last_value() {
        let d = RequestDescriptor::decode(
            br#"{"method":"GET","url":"http://x","headers":{"X-A":"first","X-A":"second"}}"#,
        )
        .unwrap();
        assert_eq!(d.headers.len(), 1);
        assert_eq!(d.headers["X-A"], "second");
    }

    #[test]
    fn test_decode_matches_field_names_case_insensitively() {
        let d = RequestDescriptor::decode(
            br#"{"Method":"GET","URL":"http://example.test/","HEADERS":{"X-Test":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(d.method, "GET");
        assert_eq!(d.url, "http://example.test/");
        assert_eq!(d.headers["X-Test"], "abc");
    }

    #[test]
    fn test_decode_later_field_match_wins() {
        let d = RequestDescriptor::decode(
            br#"{"method":"GET","Method":"POST","url":"http://a","Url":"http://b"}"#,
        )
        .unwrap();
        assert_eq!(d.method, "POST");
        assert_eq!(d.url, "http://b");
    }

    #[test]
    fn test_decode_null_keeps_earlier_string_value() {
        let d = RequestDescriptor::decode(br#"{"method":"GET","Method":null,"url":"http://x"}"#)
            .unwrap();
        assert_eq!(d.method, "GET");
    }

    #[test]
    fn test_decode_repeated_headers_objects_merge() {
        let d = RequestDescriptor::decode(
            br#"{"method":"GET","url":"http://x","headers":{"A":"1","B":"old"},"Headers":{"B":"new"}}"#,
        )
        .unwrap();
        assert_eq!(d.headers.len(), 2);
        assert_eq!(d.headers["A"], "1");
        assert_eq!(d.headers["B"], "new");

        let d = RequestDescriptor::decode(
            br#"{"method":"GET","url":"http://x","headers":{"A":"1"},"headers":null}"#,
        )
        .unwrap();
        assert!(d.headers.is_empty());
    }

    #[test]
    fn test_canonical_header_name() {
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
        assert_eq!(canonical_header_name("set-cookie"), "Set-Cookie");
        assert_eq!(canonical_header_name("X-REQUEST-ID"), "X-Request-Id");
        assert_eq!(canonical_header_name("etag"), "Etag");
        assert_eq!(canonical_header_name("bad header"), "bad header");
    }

    #[test]
    fn test_collect_headers_keeps_multi_values_in_order() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("content-length", HeaderValue::from_static("42"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));

        let collected = collect_headers(&headers);
        assert_eq!(collected["Set-Cookie"], vec!["a=1", "b=2"]);
        assert_eq!(collected["Content-Length"], vec!["42"]);
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = ResponseSummary {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
            status: 200,
            headers: BTreeMap::from([("Content-Length".to_string(), vec!["42".to_string()])]),
            length: 42,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["status"], 200);
        assert_eq!(json["headers"]["Content-Length"][0], "42");
        assert_eq!(json["length"], 42);
    }
}
