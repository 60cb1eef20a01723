// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failures a plugin can report while starting up (spec §4.7 "On startup,
/// plugins are loaded and their seed state installed atomically"). Once
/// running, a plugin's own errors are caught at the boundary and logged —
/// never propagated into the kernel (spec §7) — so this type only appears
/// at `get_complete_state`, the one call the host treats as fatal-to-this-
/// plugin on failure.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {namespace} failed to fetch initial state: {reason}")]
    SeedStateFailed { namespace: String, reason: String },
}
