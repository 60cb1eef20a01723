// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal built-in app: logs a heartbeat on a configurable interval.
//! Exercises the [`autod_apps::App`] contract and `Kernel::run_every` end
//! to end without depending on any plugin-supplied entity.

use autod_apps::{App, AppFactory};
use autod_core::kwargs::Kwargs;
use autod_core::{AppConfigEntry, AppId, AppName, DaemonClock};
use autod_engine::Kernel;
use std::sync::Arc;

struct HeartbeatApp {
    name: AppName,
}

impl App for HeartbeatApp {
    fn initialize(&self) {
        tracing::info!(app = %self.name, "heartbeat app initialized");
    }

    fn terminate(&self) {
        tracing::info!(app = %self.name, "heartbeat app terminated");
    }
}

pub fn factory(kernel: Arc<Kernel<DaemonClock>>) -> AppFactory {
    Arc::new(move |name: AppName, app_id: AppId, entry: &AppConfigEntry| {
        let interval = entry.extra.get("interval_seconds").and_then(|v| v.as_i64()).unwrap_or(300);
        let log_name = name.clone();
        let start = kernel.get_now_ts() + interval;
        let function = Arc::new(move |_kwargs: Kwargs| {
            tracing::info!(app = %log_name, "heartbeat");
        });
        if let Err(err) = kernel.run_every(name.clone(), app_id, start, interval, Kwargs::new(), function) {
            tracing::warn!(app = %name, error = %err, "heartbeat app failed to schedule");
        }
        Arc::new(HeartbeatApp { name }) as Arc<dyn App>
    })
}
