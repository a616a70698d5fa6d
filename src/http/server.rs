//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler as fallback
//! - Serve `/static` straight from the fixture root
//! - Wire up middleware (request ID, tracing, body limit)
//! - Buffer the request body and hand the request to the dispatcher
//! - Convert the dispatcher's envelope into the HTTP response

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{validate_config, ConfigError, CoreConfig, MockProxyConfig};
use crate::dispatch::Dispatcher;
use crate::fixtures::FunctionRegistry;
use crate::http::request::{request_id, InboundRequest, UuidRequestId};
use crate::http::response::ResponseEnvelope;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_size: usize,
}

/// HTTP server for the mock proxy.
pub struct HttpServer {
    router: Router,
    core: CoreConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Validate the configuration and build the server with the built-in
    /// response functions.
    pub fn from_config(config: MockProxyConfig) -> Result<Self, ConfigError> {
        Self::with_functions(config, FunctionRegistry::with_builtins())
    }

    /// Same as `from_config`, with a caller-provided function registry.
    pub fn with_functions(config: MockProxyConfig, functions: FunctionRegistry) -> Result<Self, ConfigError> {
        let core = validate_config(&config).map_err(ConfigError::Validation)?;
        let dispatcher = Dispatcher::from_config(&core, functions)
            .map_err(|e| ConfigError::Upstream(e.to_string()))?;
        let dispatcher = Arc::new(dispatcher);

        let state = AppState {
            dispatcher: dispatcher.clone(),
            max_body_size: config.limits.max_body_size,
        };

        let router = Self::build_router(&core, state);
        Ok(Self {
            router,
            core,
            dispatcher,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(core: &CoreConfig, state: AppState) -> Router {
        let max_body_size = state.max_body_size;
        let mut router = Router::new().fallback(dispatch_handler);

        if let Some(root) = &core.fixture_root {
            router = router.nest_service("/static", ServeDir::new(root.join("static")));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(max_body_size)),
        )
    }

    /// Run the server until a shutdown notice arrives.
    pub async fn run(self, listener: TcpListener, shutdown_rx: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = %self.dispatcher.mode(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait_for(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Resolved configuration the server was built from.
    pub fn core(&self) -> &CoreConfig {
        &self.core
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

/// Catch-all handler: buffer, dispatch, respond.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            metrics::record_request(&method, 413, "rejected", start_time);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let inbound = InboundRequest::from_parts(&parts, bytes);
    tracing::info!(
        request_id = %request_id,
        method = %inbound.method,
        path = %inbound.path_and_query(),
        mode = %state.dispatcher.mode(),
        "Request received"
    );

    let envelope = match state.dispatcher.handle(&inbound).await {
        Some(envelope) => envelope,
        None => {
            tracing::warn!(
                request_id = %request_id,
                path = %inbound.path,
                "Upstream result discarded and no fixture found"
            );
            ResponseEnvelope::no_fixture()
        }
    };

    let status = envelope.status.as_u16();
    if envelope.status.is_success() {
        tracing::info!(request_id = %request_id, status, origin = envelope.origin.as_str(), "Response sent");
    } else {
        tracing::warn!(request_id = %request_id, status, origin = envelope.origin.as_str(), "Response sent");
    }
    metrics::record_request(&method, status, envelope.origin.as_str(), start_time);

    envelope.into_response()
}
