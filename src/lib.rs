//! HTTP mock server and recording proxy library.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod fixtures;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;

pub use config::schema::MockProxyConfig;
pub use dispatch::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::ServingMode;
