//! Mode-driven request dispatch.
//!
//! # Dispatch Order
//! ```text
//! FULL_PROXY:  upstream                     → upstream result (or error envelope)
//! MOCK_FIRST:  fixture ─miss→ upstream      → fixture or upstream result
//! PROXY_FIRST: upstream, then fixture       → fixture, or nothing
//! FULL_MOCK:   fixture                      → fixture or 504 "Mock data fail"
//! ```
//!
//! PROXY_FIRST discards the upstream result even when it succeeded; the
//! upstream call still counts timeouts and still records fixtures.
//!
//! A fixture is a hit whenever it exists on disk, whatever status its headers
//! file carries. A hand-placed fixture with `status: 504` is therefore served
//! in MOCK_FIRST and PROXY_FIRST rather than treated as a miss; only
//! `LoadedResponse::Missing` falls through to the upstream.

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::fixtures::{FixtureStore, FunctionRegistry, LoadedResponse};
use crate::http::request::InboundRequest;
use crate::http::response::ResponseEnvelope;
use crate::proxy::{ProxyError, ProxyForwarder};
use crate::resilience::{ModeController, ServingMode};

/// Composes fixture lookup and upstream forwarding per serving mode.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    modes: Arc<ModeController>,
    store: Option<Arc<FixtureStore>>,
    forwarder: Option<ProxyForwarder>,
}

impl Dispatcher {
    pub fn new(modes: Arc<ModeController>) -> Self {
        Self {
            modes,
            store: None,
            forwarder: None,
        }
    }

    pub fn with_store(mut self, store: Arc<FixtureStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_forwarder(mut self, forwarder: ProxyForwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Wire store, forwarder and mode controller from resolved configuration.
    pub fn from_config(config: &CoreConfig, functions: FunctionRegistry) -> Result<Self, ProxyError> {
        let modes = Arc::new(ModeController::new(config.mode));
        let store = config
            .fixture_root
            .as_ref()
            .map(|root| Arc::new(FixtureStore::new(root.clone()).with_functions(functions)));

        let mut dispatcher = Self::new(modes.clone());
        if let Some(store) = &store {
            dispatcher = dispatcher.with_store(store.clone());
        }

        if let Some(upstream) = &config.upstream {
            let mut forwarder = ProxyForwarder::new(upstream.clone(), config.timeout, modes)?;
            if config.capture {
                if let Some(store) = &store {
                    forwarder = forwarder.with_capture(store.clone());
                }
            }
            dispatcher = dispatcher.with_forwarder(forwarder);
        }

        Ok(dispatcher)
    }

    pub fn mode(&self) -> ServingMode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &Arc<ModeController> {
        &self.modes
    }

    /// Produce the response for one request.
    ///
    /// `None` only in PROXY_FIRST when no fixture exists.
    pub async fn handle(&self, request: &InboundRequest) -> Option<ResponseEnvelope> {
        match self.modes.mode() {
            ServingMode::FullProxy => Some(self.forward(request).await),
            ServingMode::MockFirst => {
                let loaded = self.load(request).await;
                if !loaded.is_missing() {
                    return Some(loaded.into_envelope());
                }
                tracing::debug!(path = %request.path, "No fixture, falling back to upstream");
                Some(self.forward(request).await)
            }
            ServingMode::ProxyFirst => {
                let upstream = self.forward(request).await;
                tracing::debug!(
                    path = %request.path,
                    upstream_status = upstream.status.as_u16(),
                    "Upstream result discarded in PROXY_FIRST, consulting fixtures"
                );
                match self.load(request).await {
                    LoadedResponse::Missing => None,
                    loaded => Some(loaded.into_envelope()),
                }
            }
            ServingMode::FullMock => Some(self.load(request).await.into_envelope()),
        }
    }

    async fn load(&self, request: &InboundRequest) -> LoadedResponse {
        match &self.store {
            Some(store) => store.load_response(request).await,
            None => LoadedResponse::Missing,
        }
    }

    async fn forward(&self, request: &InboundRequest) -> ResponseEnvelope {
        let result = match &self.forwarder {
            Some(forwarder) => forwarder.forward(request).await,
            None => Err(ProxyError::NotConfigured),
        };
        result.unwrap_or_else(|e| ResponseEnvelope::proxy_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureHeaders;
    use crate::http::response::ResponseOrigin;
    use crate::resilience::TimeoutOutcome;
    use axum::body::Bytes;
    use axum::http::{Method, StatusCode};
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    fn closed_port_url() -> Url {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn dispatcher(mode: ServingMode, root: &TempDir) -> Dispatcher {
        let modes = Arc::new(ModeController::new(mode));
        let forwarder = ProxyForwarder::new(closed_port_url(), Duration::from_secs(1), modes.clone()).unwrap();
        Dispatcher::new(modes)
            .with_store(Arc::new(FixtureStore::new(root.path())))
            .with_forwarder(forwarder)
    }

    async fn seed(root: &TempDir, path: &str, body: &'static [u8]) {
        let store = FixtureStore::new(root.path());
        store
            .capture(&InboundRequest::new(Method::GET, path), &FixtureHeaders::new().with_status(200), body)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_mock_without_fixture() {
        let root = TempDir::new().unwrap();
        let dispatcher = dispatcher(ServingMode::FullMock, &root);
        let request = InboundRequest::new(Method::GET, "/users/1").with_header("authorization", "Bearer t");

        let envelope = dispatcher.handle(&request).await.unwrap();
        assert_eq!(envelope.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(envelope.body, Bytes::from_static(b"Mock data fail"));
        assert_eq!(envelope.origin, ResponseOrigin::MockFailure);
    }

    #[tokio::test]
    async fn test_mock_first_prefers_fixture() {
        let root = TempDir::new().unwrap();
        seed(&root, "/ping", b"pong").await;
        let dispatcher = dispatcher(ServingMode::MockFirst, &root);

        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/ping")).await.unwrap();
        assert_eq!(envelope.origin, ResponseOrigin::Fixture);
        assert_eq!(envelope.body, Bytes::from_static(b"pong"));
    }

    #[tokio::test]
    async fn test_mock_first_falls_back_to_upstream() {
        let root = TempDir::new().unwrap();
        let dispatcher = dispatcher(ServingMode::MockFirst, &root);

        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/none")).await.unwrap();
        assert_eq!(envelope.origin, ResponseOrigin::ProxyError);
        assert_eq!(envelope.status, StatusCode::BAD_GATEWAY);
        assert_eq!(dispatcher.modes().consecutive_timeouts(), 0);
    }

    #[tokio::test]
    async fn test_proxy_first_without_fixture_sends_nothing() {
        let root = TempDir::new().unwrap();
        let dispatcher = dispatcher(ServingMode::ProxyFirst, &root);
        assert!(dispatcher.handle(&InboundRequest::new(Method::GET, "/none")).await.is_none());
    }

    #[tokio::test]
    async fn test_proxy_first_serves_fixture_after_failure() {
        let root = TempDir::new().unwrap();
        seed(&root, "/cached", b"from disk").await;
        let dispatcher = dispatcher(ServingMode::ProxyFirst, &root);

        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/cached")).await.unwrap();
        assert_eq!(envelope.origin, ResponseOrigin::Fixture);
        assert_eq!(envelope.body, Bytes::from_static(b"from disk"));
    }

    #[tokio::test]
    async fn test_follows_downgrade() {
        let root = TempDir::new().unwrap();
        let dispatcher = dispatcher(ServingMode::FullProxy, &root);
        for _ in 0..3 {
            dispatcher.modes().record_timeout();
        }
        assert_eq!(dispatcher.mode(), ServingMode::FullMock);

        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/x")).await.unwrap();
        assert_eq!(envelope.origin, ResponseOrigin::MockFailure);
    }

    #[tokio::test]
    async fn test_transport_error_between_timeouts_keeps_count() {
        let root = TempDir::new().unwrap();
        let dispatcher = dispatcher(ServingMode::FullProxy, &root);
        let modes = dispatcher.modes().clone();

        assert_eq!(modes.record_timeout(), TimeoutOutcome::Counted(1));

        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/x")).await.unwrap();
        assert_eq!(envelope.status, StatusCode::BAD_GATEWAY);
        assert_eq!(modes.consecutive_timeouts(), 1);

        assert_eq!(modes.record_timeout(), TimeoutOutcome::Counted(2));
        assert_eq!(dispatcher.mode(), ServingMode::FullProxy);

        assert_eq!(
            modes.record_timeout(),
            TimeoutOutcome::Tripped { previous: ServingMode::FullProxy }
        );
        assert_eq!(dispatcher.mode(), ServingMode::FullMock);
        assert_eq!(modes.consecutive_timeouts(), 0);
    }

    #[tokio::test]
    async fn test_fixture_with_mock_fail_status_is_served() {
        let root = TempDir::new().unwrap();
        let store = FixtureStore::new(root.path());
        store
            .capture(
                &InboundRequest::new(Method::GET, "/flaky"),
                &FixtureHeaders::new().with_status(504),
                b"stored failure",
            )
            .await
            .unwrap();
        let dispatcher = dispatcher(ServingMode::MockFirst, &root);

        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/flaky")).await.unwrap();
        assert_eq!(envelope.origin, ResponseOrigin::Fixture);
        assert_eq!(envelope.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(envelope.body, Bytes::from_static(b"stored failure"));
    }

    #[tokio::test]
    async fn test_missing_forwarder_and_store() {
        let modes = Arc::new(ModeController::new(ServingMode::FullProxy));
        let dispatcher = Dispatcher::new(modes);
        let envelope = dispatcher.handle(&InboundRequest::new(Method::GET, "/")).await.unwrap();
        assert_eq!(envelope.origin, ResponseOrigin::ProxyError);
    }
}
