// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replies the daemon sends back for each [`crate::Query`].

use serde::{Deserialize, Serialize};

/// One registered state/event callback, summarized for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackEntry {
    pub handle: String,
    /// `"state"`, `"event"`, or `"endpoint"` (spec §4.2/§4.3/§4.6).
    pub kind: String,
    /// Watched entity filter or event name; `"*"` for a wildcard.
    pub target: String,
    /// Watched attribute for state callbacks; empty otherwise.
    pub attribute: String,
}

/// One pending scheduler entry, summarized for display (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub handle: String,
    /// Unix epoch seconds of the next fire time.
    pub next_fire: i64,
    /// Repeat interval in seconds; 0 for one-shot timers.
    pub interval: i64,
    pub inactive: bool,
}

/// Replies a daemon sends back for a [`crate::Query`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Ok,
    Error {
        message: String,
    },
    Apps {
        names: Vec<String>,
    },
    Callbacks {
        entries: Vec<CallbackEntry>,
    },
    Schedule {
        entries: Vec<ScheduleEntry>,
    },
    SunInfo {
        sunrise: i64,
        sunset: i64,
    },
    QueueDepth {
        pending: usize,
        capacity: usize,
    },
    ShuttingDown,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
