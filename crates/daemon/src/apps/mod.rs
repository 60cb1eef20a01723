// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in app factories.
//!
//! Rust has no equivalent of importing an arbitrary `.py` file by path, so
//! "the apps a daemon runs" are compiled-in Rust types registered here by
//! module name, rather than discovered on disk (spec §4.8's load machinery
//! still runs — mtime scanning, dependency batching — it just resolves a
//! module name to one of these factories instead of loading source).

mod heartbeat;

use autod_apps::AppFactory;
use autod_core::DaemonClock;
use autod_engine::Kernel;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The modules a daemon built from this binary knows how to run. Extra
/// deployments would add their own app crates and extend this map.
pub fn factories(kernel: Arc<Kernel<DaemonClock>>) -> BTreeMap<String, AppFactory> {
    let mut map: BTreeMap<String, AppFactory> = BTreeMap::new();
    map.insert("heartbeat".to_string(), heartbeat::factory(kernel));
    map
}
