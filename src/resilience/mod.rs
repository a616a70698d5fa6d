//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → proxy/forwarder.rs (per-call timeout)
//!     → On timeout: circuit_breaker.rs (count, downgrade to FULL_MOCK at threshold)
//!     → dispatch reads the current mode for every request
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: a timed-out call is terminal for its request
//! - The breaker is owned by the server, not a process global

pub mod circuit_breaker;

pub use circuit_breaker::{ModeController, ServingMode, TimeoutOutcome, TIMEOUT_THRESHOLD};
