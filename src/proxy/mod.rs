//! Upstream proxy subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → forwarder.rs (rewrite URL, strip headers, send with timeout)
//!     → 200 + recording: fixtures::FixtureStore::capture
//!     → ResponseEnvelope (any upstream status) | ProxyError
//! ```

pub mod forwarder;

pub use forwarder::ProxyForwarder;

use std::time::Duration;

/// Upstream call failure.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Counted by the circuit breaker.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("invalid upstream URL `{0}`")]
    InvalidUrl(String),

    #[error("no upstream configured")]
    NotConfigured,
}

impl ProxyError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProxyError::Timeout(_))
    }

    /// Short label for logs, metrics and the `x-proxy-error` header.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Timeout(_) => "timeout",
            ProxyError::Transport(_) => "transport",
            ProxyError::InvalidUrl(_) => "invalid_url",
            ProxyError::NotConfigured => "not_configured",
        }
    }
}
