//! Response envelope and its conversion to an HTTP response.
//!
//! # Responsibilities
//! - Apply default headers (`status: 200`, JSON content type) under fixture headers
//! - Map proxy failures to gateway status codes
//! - Drop hop-by-hop headers and stale `content-length` before emission
//!
//! # Design Decisions
//! - Backend timeouts result in 504 Gateway Timeout, other transport errors in 502
//! - The synthetic "no fixture" reply is a 504 with a fixed plain-text body

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::fixtures::FixtureHeaders;
use crate::proxy::ProxyError;

pub const MOCK_FAIL_STATUS: StatusCode = StatusCode::GATEWAY_TIMEOUT;
pub const MOCK_FAIL_BODY: &str = "Mock data fail";
pub const X_PROXY_ERROR: &str = "x-proxy-error";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// True for headers that must not be copied between connections.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrigin {
    Fixture,
    Upstream,
    MockFailure,
    ProxyError,
    NoFixture,
}

impl ResponseOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseOrigin::Fixture => "fixture",
            ResponseOrigin::Upstream => "upstream",
            ResponseOrigin::MockFailure => "mock_failure",
            ResponseOrigin::ProxyError => "proxy_error",
            ResponseOrigin::NoFixture => "no_fixture",
        }
    }
}

/// The single value the dispatcher hands to the transport.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub origin: ResponseOrigin,
}

impl ResponseEnvelope {
    /// Build from stored (or captured) headers over the defaults.
    pub fn from_fixture(headers: &FixtureHeaders, body: Bytes) -> Self {
        let mut map = HeaderMap::new();
        map.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, values) in headers.iter() {
            if is_hop_by_hop(name) || name == header::CONTENT_LENGTH.as_str() {
                continue;
            }
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                tracing::debug!(header = name, "Skipping invalid header name");
                continue;
            };
            let mut first = true;
            for value in values {
                let Ok(value) = HeaderValue::from_str(value) else {
                    continue;
                };
                if first {
                    map.insert(name.clone(), value);
                    first = false;
                } else {
                    map.append(name.clone(), value);
                }
            }
        }

        let status = headers
            .status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::OK);

        Self {
            status,
            headers: map,
            body,
            origin: ResponseOrigin::Fixture,
        }
    }

    pub fn upstream(headers: &FixtureHeaders, body: Bytes) -> Self {
        Self {
            origin: ResponseOrigin::Upstream,
            ..Self::from_fixture(headers, body)
        }
    }

    /// The synthetic "no fixture" reply.
    pub fn mock_failure() -> Self {
        Self::plain(MOCK_FAIL_STATUS, MOCK_FAIL_BODY, ResponseOrigin::MockFailure)
    }

    pub fn proxy_error(error: &ProxyError) -> Self {
        let status = if error.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        };
        let mut envelope = Self::plain(
            status,
            status.canonical_reason().unwrap_or("Upstream request failed"),
            ResponseOrigin::ProxyError,
        );
        envelope
            .headers
            .insert(X_PROXY_ERROR, HeaderValue::from_static(error.kind()));
        envelope
    }

    /// Reply used when proxy-first dispatch ends without a fixture.
    pub fn no_fixture() -> Self {
        Self::plain(StatusCode::BAD_GATEWAY, "No fixture available", ResponseOrigin::NoFixture)
    }

    fn plain(status: StatusCode, body: &'static str, origin: ResponseOrigin) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
            origin,
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
