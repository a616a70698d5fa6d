//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request onto the upstream base URL
//! - Strip `Host`, `Content-Length` and hop-by-hop headers
//! - Enforce the per-call timeout and classify failures
//! - Capture 200 responses as fixtures when recording is enabled

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, Method};
use url::Url;

use crate::fixtures::{FixtureHeaders, FixtureStore};
use crate::http::request::InboundRequest;
use crate::http::response::{is_hop_by_hop, ResponseEnvelope};
use crate::observability::metrics;
use crate::proxy::ProxyError;
use crate::resilience::ModeController;

/// Forwards requests to a single upstream.
#[derive(Debug, Clone)]
pub struct ProxyForwarder {
    client: reqwest::Client,
    upstream: Url,
    timeout: Duration,
    capture: Option<Arc<FixtureStore>>,
    modes: Arc<ModeController>,
}

impl ProxyForwarder {
    pub fn new(upstream: Url, timeout: Duration, modes: Arc<ModeController>) -> Result<Self, ProxyError> {
        // Environment proxy variables are ignored: the upstream is always dialed directly.
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            upstream,
            timeout,
            capture: None,
            modes,
        })
    }

    /// Record 200 responses into the given store.
    pub fn with_capture(mut self, store: Arc<FixtureStore>) -> Self {
        self.capture = Some(store);
        self
    }

    /// Upstream base URL followed by the request path and query.
    pub fn target_url(&self, request: &InboundRequest) -> Result<Url, ProxyError> {
        let base = self.upstream.as_str().trim_end_matches('/');
        let target = format!("{}{}", base, request.path_and_query());
        Url::parse(&target).map_err(|_| ProxyError::InvalidUrl(target))
    }

    /// Forward the request and return the upstream response.
    pub async fn forward(&self, request: &InboundRequest) -> Result<ResponseEnvelope, ProxyError> {
        let url = self.target_url(request)?;
        tracing::info!(method = %request.method, url = %url, "Forwarding to upstream");

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .headers(forward_headers(&request.headers))
            .timeout(self.timeout);

        if request.method != Method::GET {
            if let Some(body) = request.body.wire_bytes() {
                builder = builder.body(body);
            }
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let headers = FixtureHeaders::from_response(status, response.headers());
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        tracing::info!(url = %url, status = status.as_u16(), "Upstream responded");

        if status == reqwest::StatusCode::OK {
            if let Some(store) = &self.capture {
                match store.capture(request, &headers, &body).await {
                    Ok(()) => metrics::record_capture(true),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Failed to record fixture");
                        metrics::record_capture(false);
                    }
                }
            }
        }

        Ok(ResponseEnvelope::upstream(&headers, body))
    }

    fn classify(&self, error: reqwest::Error) -> ProxyError {
        let error = if error.is_timeout() {
            self.modes.record_timeout();
            ProxyError::Timeout(self.timeout)
        } else {
            ProxyError::Transport(error.to_string())
        };
        tracing::warn!(kind = error.kind(), error = %error, "Upstream request failed");
        metrics::record_proxy_error(error.kind());
        error
    }
}

fn forward_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound.iter() {
        if name == header::HOST || name == header::CONTENT_LENGTH || is_hop_by_hop(name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
