//! Serving mode and timeout circuit breaker.
//!
//! # States
//! - FULL_PROXY: every request is forwarded upstream
//! - MOCK_FIRST: fixture first, upstream on miss
//! - PROXY_FIRST: upstream first, then fixture
//! - FULL_MOCK: fixtures only
//!
//! # State Transitions
//! ```text
//! any mode → FULL_MOCK: consecutive upstream timeouts >= threshold
//! FULL_MOCK → (none)
//! ```
//!
//! # Design Decisions
//! - One-way latch; leaving FULL_MOCK requires a restart
//! - Only timeouts count; other failures and successes leave the counter alone
//! - Mode and counter share one `AtomicU64`, so increment, threshold check,
//!   reset and downgrade are a single read-modify-write

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::metrics;

/// Consecutive timeouts that force FULL_MOCK.
pub const TIMEOUT_THRESHOLD: u32 = 3;

/// Order in which fixtures and the upstream are consulted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServingMode {
    FullProxy = 0,
    MockFirst = 1,
    ProxyFirst = 2,
    FullMock = 3,
}

impl ServingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServingMode::FullProxy => "FULL_PROXY",
            ServingMode::MockFirst => "MOCK_FIRST",
            ServingMode::ProxyFirst => "PROXY_FIRST",
            ServingMode::FullMock => "FULL_MOCK",
        }
    }
}

impl From<u8> for ServingMode {
    fn from(val: u8) -> Self {
        match val {
            0 => ServingMode::FullProxy,
            1 => ServingMode::MockFirst,
            2 => ServingMode::ProxyFirst,
            _ => ServingMode::FullMock,
        }
    }
}

impl fmt::Display for ServingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of recording one upstream timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// Counter after the increment.
    Counted(u32),
    /// Threshold reached; mode forced to FULL_MOCK and counter reset.
    Tripped { previous: ServingMode },
}

fn pack(mode: ServingMode, timeouts: u32) -> u64 {
    ((mode as u64) << 32) | u64::from(timeouts)
}

fn unpack(state: u64) -> (ServingMode, u32) {
    (ServingMode::from((state >> 32) as u8), state as u32)
}

/// Holds the current serving mode and the consecutive-timeout counter.
#[derive(Debug)]
pub struct ModeController {
    state: AtomicU64,
    threshold: u32,
}

impl ModeController {
    pub fn new(mode: ServingMode) -> Self {
        Self::with_threshold(mode, TIMEOUT_THRESHOLD)
    }

    pub fn with_threshold(mode: ServingMode, threshold: u32) -> Self {
        metrics::record_mode(mode);
        Self {
            state: AtomicU64::new(pack(mode, 0)),
            threshold: threshold.max(1),
        }
    }

    pub fn mode(&self) -> ServingMode {
        unpack(self.state.load(Ordering::Acquire)).0
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        unpack(self.state.load(Ordering::Acquire)).1
    }

    /// Count one upstream timeout, downgrading to FULL_MOCK at the threshold.
    pub fn record_timeout(&self) -> TimeoutOutcome {
        let threshold = self.threshold;
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let (mode, timeouts) = unpack(state);
                let next = timeouts.saturating_add(1);
                if next >= threshold {
                    Some(pack(ServingMode::FullMock, 0))
                } else {
                    Some(pack(mode, next))
                }
            })
            .unwrap_or_else(|state| state);

        let (previous_mode, timeouts) = unpack(previous);
        let next = timeouts.saturating_add(1);
        if next >= threshold {
            tracing::warn!(
                previous_mode = %previous_mode,
                threshold,
                "Upstream timeout threshold reached, falling back to FULL_MOCK"
            );
            metrics::record_mode(ServingMode::FullMock);
            TimeoutOutcome::Tripped { previous: previous_mode }
        } else {
            tracing::debug!(consecutive_timeouts = next, threshold, "Upstream timeout counted");
            TimeoutOutcome::Counted(next)
        }
    }
}
