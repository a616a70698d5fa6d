//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, /static)
//!     → request.rs (request ID, buffer + parse body)
//!     → dispatch (mode decides fixture / upstream order)
//!     → response.rs (envelope → HTTP response, default headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, RequestBody, X_REQUEST_ID};
pub use response::{ResponseEnvelope, ResponseOrigin};
pub use server::HttpServer;
