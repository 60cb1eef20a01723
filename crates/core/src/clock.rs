// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! The kernel's notion of "now" is always an integer unix timestamp (spec
//! §4.1), not a monotonic [`std::time::Instant`] — schedule entries are
//! keyed by absolute `timestamp` fields, and sun computation needs a real
//! calendar date. [`Clock::now_ts`] is the single source of truth the main
//! loop advances once per tick.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A clock that provides the kernel's current virtual time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Unix seconds, as of the clock's last advance.
    fn now_ts(&self) -> i64;
}

/// Real wall clock. `now_ts` always reflects `SystemTime::now()`; the main
/// loop uses this directly in realtime mode and only trusts its own
/// advancing counter when resyncing after clock skew (spec §4.1, §7).
#[derive(Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn wall_now_ts() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
    }
}

impl Clock for SystemClock {
    fn now_ts(&self) -> i64 {
        Self::wall_now_ts()
    }
}

/// Fake clock for testing and for simulated-mode runs, with externally
/// controlled time (spec §4.1 "Simulated" mode: seeded by `start_time`,
/// advanced purely by `interval`, wall clock ignored).
#[derive(Clone)]
pub struct FakeClock {
    now_ts: Arc<AtomicI64>,
    // Guards compound advance+read sequences in tests that need to observe
    // a consistent snapshot across multiple fields (e.g. clock + DST flag).
    guard: Arc<Mutex<()>>,
}

impl FakeClock {
    pub fn new(start_ts: i64) -> Self {
        Self { now_ts: Arc::new(AtomicI64::new(start_ts)), guard: Arc::new(Mutex::new(())) }
    }

    /// Advance the clock by `seconds`, returning the new value.
    pub fn advance(&self, seconds: i64) -> i64 {
        let _lock = self.guard.lock();
        self.now_ts.fetch_add(seconds, Ordering::SeqCst) + seconds
    }

    /// Set the clock to an absolute unix-seconds value.
    pub fn set(&self, ts: i64) {
        let _lock = self.guard.lock();
        self.now_ts.store(ts, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn now_ts(&self) -> i64 {
        self.now_ts.load(Ordering::SeqCst)
    }
}

/// The clock a running daemon actually uses: real wall time, or a
/// [`FakeClock`] driven by the main loop itself (spec §4.1 "Simulated" —
/// `realtime: false` in the `AppDaemon:` settings). A single enum rather
/// than making every caller of `Kernel<C>` generic over which mode is
/// active, since the choice is made once at startup from config.
#[derive(Clone)]
pub enum DaemonClock {
    Real(SystemClock),
    Simulated(FakeClock),
}

impl DaemonClock {
    pub fn real() -> Self {
        Self::Real(SystemClock)
    }

    /// Builds a simulated clock seeded at `start_ts`, returning it alongside
    /// the underlying [`FakeClock`] handle the main loop advances each tick.
    pub fn simulated(start_ts: i64) -> (Self, FakeClock) {
        let clock = FakeClock::new(start_ts);
        (Self::Simulated(clock.clone()), clock)
    }
}

impl Clock for DaemonClock {
    fn now_ts(&self) -> i64 {
        match self {
            Self::Real(c) => c.now_ts(),
            Self::Simulated(c) => c.now_ts(),
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
