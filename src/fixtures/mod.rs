//! Fixture storage subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → key.rs (namespace, logical path, body hash → file path)
//!     → store.rs (definition file → data/func body → headers)
//!     → functions.rs (func fixtures only: named, pure response functions)
//!     → LoadedResponse (Fixture | Missing)
//!
//! Capture (proxy 200 + record enabled):
//!     headers.rs (snapshot upstream headers + status)
//!     → store.rs (atomic write of headers, data, request body)
//! ```
//!
//! # Design Decisions
//! - A miss is a value, never an error crossing into the dispatcher
//! - Writes replace whole files via temp file + rename
//! - Directory creation is idempotent under concurrent captures

pub mod functions;
pub mod headers;
pub mod key;
pub mod store;

use std::path::PathBuf;

pub use functions::{FunctionRegistry, FunctionRequest, ResponseFunction};
pub use headers::FixtureHeaders;
pub use key::{ArtifactType, FixtureKey, LogicalPath, Namespace};
pub use store::{FixtureResponse, FixtureStore, LoadedResponse};

/// Errors raised while reading or writing fixture files.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("fixture I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("headers fixture must be a JSON object")]
    NotAnObject,
}
