//! Outbound HTTP execution.
//!
//! # Responsibilities
//! - Own the single shared `reqwest::Client` (connection reuse is the
//!   client's default behavior, nothing is tuned)
//! - Turn a descriptor into an outbound request with no body
//! - Execute it under one total deadline and measure the response body
//!
//! # Design Decisions
//! - The deadline is the client's total timeout, so it covers connect,
//!   send, response headers and body drain alike
//! - Nothing is retried

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Request};
use url::{ParseError, Url};

use crate::config::UpstreamConfig;
use crate::relay::error::RelayError;
use crate::relay::types::{collect_headers, RequestDescriptor};

/// What the relay keeps from an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub length: u64,
}

/// Shared client for outbound calls.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    inner: Client,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build the client with the configured total timeout.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let timeout = config.timeout();
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { inner, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the outbound request for `descriptor`.
    ///
    /// An invalid method or a URL that cannot be parsed at all is a
    /// construction error. Relative or host-less URLs and header names or
    /// values the HTTP stack rejects only fail once sent, so they surface as
    /// transport failures instead.
    pub fn build_request(&self, descriptor: &RequestDescriptor) -> Result<Request, RelayError> {
        let method = Method::from_bytes(descriptor.method.as_bytes()).map_err(|e| {
            RelayError::RequestConstruction(format!("method {:?}: {}", descriptor.method, e))
        })?;
        let url = parse_target(&descriptor.url)?;
        let headers = outbound_headers(descriptor)?;

        self.inner
            .request(method, url)
            .headers(headers)
            .build()
            .map_err(|e| RelayError::RequestConstruction(e.to_string()))
    }

    /// Send `request`, drain the body and report status, headers and length.
    pub async fn execute(&self, request: Request) -> Result<UpstreamResponse, RelayError> {
        let response = self.inner.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                RelayError::UpstreamTimeout(self.timeout)
            } else {
                RelayError::Upstream(error_chain(&e))
            }
        })?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::BodyRead(error_chain(&e)))?;

        Ok(UpstreamResponse {
            status,
            headers,
            length: body.len() as u64,
        })
    }
}

fn parse_target(raw: &str) -> Result<Url, RelayError> {
    if raw.starts_with(':') {
        return Err(RelayError::RequestConstruction(format!(
            "url {:?}: missing protocol scheme",
            raw
        )));
    }
    if has_invalid_escape(raw) {
        return Err(RelayError::RequestConstruction(format!(
            "url {:?}: invalid percent escape",
            raw
        )));
    }

    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(url),
        Ok(url) => Err(RelayError::Upstream(format!(
            "url {:?}: no host for scheme {:?}",
            raw,
            url.scheme()
        ))),
        Err(e @ (ParseError::RelativeUrlWithoutBase | ParseError::EmptyHost)) => {
            Err(RelayError::Upstream(format!("url {:?}: {}", raw, e)))
        }
        Err(e) => Err(RelayError::RequestConstruction(format!("url {:?}: {}", raw, e))),
    }
}

/// A `%` in the path or fragment not followed by two hex digits. The query
/// is sent as written and not checked.
fn has_invalid_escape(raw: &str) -> bool {
    let (rest, fragment) = raw.split_once('#').unwrap_or((raw, ""));
    let path = rest.split_once('?').map_or(rest, |(path, _)| path);

    [path, fragment].iter().any(|part| {
        let bytes = part.as_bytes();
        bytes.iter().enumerate().any(|(i, &b)| {
            b == b'%'
                && !(bytes.get(i + 1).is_some_and(|c| c.is_ascii_hexdigit())
                    && bytes.get(i + 2).is_some_and(|c| c.is_ascii_hexdigit()))
        })
    })
}

fn outbound_headers(descriptor: &RequestDescriptor) -> Result<HeaderMap, RelayError> {
    let mut headers = HeaderMap::with_capacity(descriptor.headers.len());
    for (name, value) in &descriptor.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::Upstream(format!("invalid header field name {:?}", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            RelayError::Upstream(format!("invalid header field value for {:?}", name.as_str()))
        })?;
        // Keys differing only in case both go out.
        headers.append(name, value);
    }
    Ok(headers)
}

/// reqwest's top-level message hides the interesting part in `source()`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
