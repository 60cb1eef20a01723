// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests the CLI sends to the daemon over the control socket (spec
//! §6 "CLI/diagnostic surface").

use serde::{Deserialize, Serialize};

/// Requests the CLI can send to a running daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    /// Liveness check; the daemon answers with `Response::Pong`.
    Ping,
    /// List every app the daemon has loaded, running or not.
    ListApps,
    /// Every registered callback for one app (handle, event kind, target).
    GetCallbacks {
        app: String,
    },
    /// Every pending scheduler entry for one app (fire time, interval).
    GetSchedule {
        app: String,
    },
    /// Current sunrise/sunset for the configured location, in the
    /// configured timezone.
    GetSunInfo,
    /// Depth and capacity of the dispatcher's callback queue.
    GetQueueDepth,
    /// Re-read the config file and reconcile running apps against it
    /// (spec §4.8 "Config reload"), without restarting the daemon.
    ReloadApps,
    /// Stop one app without touching the others.
    StopApp {
        app: String,
    },
    /// Shut the daemon down cleanly.
    Stop,
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
