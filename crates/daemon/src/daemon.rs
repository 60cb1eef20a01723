// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the kernel, app lifecycle, and plugin host together and owns the
//! main loop (C10), the utility loop (C9), and shutdown (spec §5
//! "Cancellation").

use crate::config::{AppDaemonSettings, LoadedConfig};
use crate::error::DaemonError;
use autod_adapters::Plugin;
use autod_apps::Lifecycle;
use autod_core::{AppConfigEntry, AppDirectory, AppId, AppName, DaemonClock, FakeClock, KernelError, KernelHandle, Namespace};
use autod_engine::constraint::AlwaysPresent;
use autod_engine::{Kernel, SunCalculator};
use chrono::TimeZone;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};

/// Stands in for `Lifecycle` as the kernel's [`AppDirectory`] until
/// `Lifecycle` itself exists — `Kernel::new` needs a directory to build its
/// dispatcher, but `Lifecycle`'s app factories need the already-built
/// kernel, so neither can come first. Reads before `set` see an empty
/// directory, which is only ever true for the instant between `Kernel::new`
/// and `Lifecycle::new` below.
#[derive(Default)]
struct DeferredDirectory(OnceLock<Arc<Lifecycle>>);

impl AppDirectory for DeferredDirectory {
    fn current_id(&self, name: &AppName) -> Option<AppId> {
        self.0.get().and_then(|lifecycle| lifecycle.current_id(name))
    }

    fn app_constraints(&self, name: &AppName) -> autod_core::kwargs::Kwargs {
        self.0.get().map(|lifecycle| lifecycle.app_constraints(name)).unwrap_or_default()
    }
}

/// The event-name injected once at startup, after plugin and app
/// initialization complete (spec §6, original `appd_started`).
pub const APPD_STARTED_EVENT: &str = "appd_started";
/// The event-name injected during shutdown (spec §5 "Cancellation").
pub const HA_STOP_EVENT: &str = "ha_stop";

pub const DEFAULT_NAMESPACE: &str = "hass";

/// The datetime format `start_time`/`endtime` are given in, local to
/// `time_zone` (spec §4.1 "Simulated").
const SIMULATED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_local_ts(tz: chrono_tz::Tz, raw: &str) -> Result<i64, KernelError> {
    let naive =
        chrono::NaiveDateTime::parse_from_str(raw, SIMULATED_TIME_FORMAT).map_err(|_| KernelError::InvalidTimeString(raw.to_string()))?;
    tz.from_local_datetime(&naive).single().map(|dt| dt.timestamp()).ok_or_else(|| KernelError::InvalidTimeString(raw.to_string()))
}

/// Drives a [`FakeClock`] forward from the main loop instead of trusting the
/// wall clock (spec §4.1 "Simulated").
struct SimulatedClock {
    handle: FakeClock,
    interval: i64,
    end_ts: Option<i64>,
}

pub struct Daemon {
    pub kernel: Arc<Kernel<DaemonClock>>,
    pub lifecycle: Arc<Lifecycle>,
    plugins: Vec<Arc<dyn Plugin>>,
    plugin_shutdowns: Mutex<Vec<oneshot::Sender<()>>>,
    app_dir: PathBuf,
    config_path: Option<PathBuf>,
    config_mtime: Mutex<Option<std::time::SystemTime>>,
    current_config: Mutex<BTreeMap<AppName, AppConfigEntry>>,
    shutdown: Arc<Notify>,
    tick: Duration,
    utility_delay: Duration,
    simulated: Option<SimulatedClock>,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("app_dir", &self.app_dir)
            .field("config_path", &self.config_path)
            .field("tick", &self.tick)
            .field("utility_delay", &self.utility_delay)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn new(loaded: LoadedConfig, plugins: Vec<Arc<dyn Plugin>>, config_path: Option<PathBuf>) -> Result<Self, DaemonError> {
        let AppDaemonSettings {
            latitude,
            longitude,
            elevation,
            time_zone,
            app_dir,
            threads,
            tick,
            utility_delay,
            queue_size,
            realtime,
            start_time,
            endtime,
            interval,
            ..
        } = loaded.settings;

        let tz = chrono_tz::Tz::from_str(&time_zone).map_err(|_| KernelError::InvalidTimeString(time_zone.clone()))?;
        let sun_calc = SunCalculator::new(latitude, longitude, elevation, tz)?;

        let (clock, simulated) = if realtime {
            (DaemonClock::real(), None)
        } else {
            let start_raw = start_time.ok_or_else(|| KernelError::InvalidTimeString("start_time is required when realtime is false".to_string()))?;
            let start_ts = parse_local_ts(tz, &start_raw)?;
            let end_ts = endtime.as_deref().map(|raw| parse_local_ts(tz, raw)).transpose()?;
            let (clock, handle) = DaemonClock::simulated(start_ts);
            (clock, Some(SimulatedClock { handle, interval: interval.max(1), end_ts }))
        };

        let directory = Arc::new(DeferredDirectory::default());

        let kernel = Arc::new(Kernel::new(
            clock,
            sun_calc,
            directory.clone(),
            Arc::new(AlwaysPresent),
            Namespace::new(DEFAULT_NAMESPACE),
            queue_size,
            threads,
        ));

        let kernel_for_terminate = kernel.clone();
        let lifecycle = Arc::new(Lifecycle::new(
            crate::apps::factories(kernel.clone()),
            Arc::new(move |name: &AppName| kernel_for_terminate.terminate_app(name)),
        ));
        let _ = directory.0.set(lifecycle.clone());

        let config_mtime = config_path.as_deref().and_then(|p| std::fs::metadata(p).ok()).and_then(|m| m.modified().ok());

        Ok(Self {
            kernel,
            lifecycle,
            plugins,
            plugin_shutdowns: Mutex::new(Vec::new()),
            app_dir,
            config_path,
            config_mtime: Mutex::new(config_mtime),
            current_config: Mutex::new(loaded.apps),
            shutdown: Arc::new(Notify::new()),
            simulated,
            tick: Duration::from_secs(tick.max(1)),
            utility_delay: Duration::from_secs(utility_delay.max(1)),
        })
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Seeds every plugin's namespace into C2 and starts their `get_updates`
    /// tasks (spec §4.7 "On startup, plugins are loaded and their seed state
    /// installed atomically").
    pub async fn start_plugins(&self) -> Result<(), DaemonError> {
        for plugin in &self.plugins {
            let namespace = plugin.get_namespace();
            let seed = plugin.get_complete_state().await.map_err(|e| autod_core::KernelError::DuplicateNamespace(e.to_string()))?;
            self.kernel.install_namespace(namespace.clone(), seed)?;

            let (tx, rx) = oneshot::channel();
            self.plugin_shutdowns.lock().push(tx);
            let plugin = plugin.clone();
            let kernel: Arc<dyn KernelHandle> = self.kernel.clone();
            tokio::spawn(async move { plugin.get_updates(kernel, rx).await });
        }
        self.kernel.process_event(APPD_STARTED_EVENT, serde_json::json!({}));
        Ok(())
    }

    /// Loads every configured app for the first time (spec §4.8).
    pub fn load_apps(&self) -> Result<(), DaemonError> {
        let config = self.current_config.lock().clone();
        self.lifecycle.reload_all(&config)?;
        Ok(())
    }

    /// Reconciles running apps against the config file on disk (spec §4.8
    /// "the app-config file itself changed"): re-reads and re-parses it,
    /// diffs entries against what's currently loaded, terminates apps whose
    /// entry was removed, and reloads the module of every entry that's new
    /// or changed. Falls back to [`Self::load_apps`] when the daemon wasn't
    /// given a config path (e.g. built directly from an in-memory config in
    /// tests), since there's nothing on disk to re-read.
    pub fn reload_apps(&self) -> Result<Vec<AppName>, DaemonError> {
        let Some(path) = self.config_path.clone() else {
            self.load_apps()?;
            return Ok(self.lifecycle.loaded_app_names());
        };

        let loaded = crate::config::load(&path)?;
        *self.config_mtime.lock() = std::fs::metadata(&path).ok().and_then(|m| m.modified().ok());
        self.apply_config_diff(loaded.apps)
    }

    /// Terminates apps whose entry disappeared, then reloads the module of
    /// every entry that's new or whose config changed, leaving unchanged
    /// entries running untouched.
    fn apply_config_diff(&self, new_config: BTreeMap<AppName, AppConfigEntry>) -> Result<Vec<AppName>, DaemonError> {
        let old_config = self.current_config.lock().clone();

        for name in old_config.keys() {
            if !new_config.contains_key(name) {
                self.lifecycle.terminate_app(name);
            }
        }

        let due: std::collections::BTreeSet<String> = new_config
            .iter()
            .filter(|(name, entry)| old_config.get(*name) != Some(*entry))
            .map(|(_, entry)| entry.module.clone())
            .collect();

        let loaded = self.lifecycle.reload_modules(&due, &new_config)?;
        *self.current_config.lock() = new_config;
        Ok(loaded)
    }

    /// C10: the scheduler tick, once per `tick` seconds, forever (or until
    /// shutdown). A DST flip triggers a full app reload (spec §4.1, §4.8); a
    /// full dispatcher queue (spec §4.6) and reaching `endtime` in simulated
    /// mode (spec §4.1) both stop the daemon outright.
    pub async fn run_main_loop(&self) {
        let mut interval = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => break,
                _ = interval.tick() => {
                    if let Some(sim) = &self.simulated {
                        sim.handle.advance(sim.interval);
                    }

                    let result = self.kernel.tick();
                    if result.dst_flipped {
                        tracing::info!("DST flip detected, reloading all apps");
                        if let Err(err) = self.load_apps() {
                            tracing::warn!(error = %err, "full reload after DST flip failed");
                        }
                    }
                    if result.queue_full {
                        tracing::error!("dispatcher queue full, stopping daemon");
                        self.shutdown.notify_waiters();
                        break;
                    }
                    if let Some(end_ts) = self.simulated.as_ref().and_then(|sim| sim.end_ts) {
                        if self.kernel.get_now_ts() >= end_ts {
                            tracing::info!("simulated end time reached, stopping daemon");
                            self.shutdown.notify_waiters();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// C9: rescans apps and config once per `utility_delay` seconds, warns
    /// on queue depth, and ticks every plugin's `utility()` (spec §4.9).
    pub async fn run_utility_loop(&self) {
        let mut interval = tokio::time::interval(self.utility_delay);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => break,
                _ = interval.tick() => self.utility_pass().await,
            }
        }
    }

    /// Rescans the config file's mtime (parallel to `scan::due_modules` for
    /// app source files) and reconciles on change (spec §4.8 "the
    /// app-config file itself changed").
    async fn check_config_file(&self) {
        let Some(path) = self.config_path.clone() else { return };
        let mtime = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "could not stat config file");
                return;
            }
        };
        if *self.config_mtime.lock() == Some(mtime) {
            return;
        }

        match self.reload_apps() {
            Ok(loaded) if !loaded.is_empty() => tracing::info!(apps = ?loaded, "config file changed, reloaded apps"),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "config reload failed"),
        }
    }

    async fn utility_pass(&self) {
        self.check_config_file().await;

        let config = self.current_config.lock().clone();
        match self.lifecycle.sync(&self.app_dir, &config) {
            Ok(loaded) if !loaded.is_empty() => tracing::info!(apps = ?loaded, "reloaded apps"),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "app rescan failed"),
        }

        let (pending, capacity) = self.kernel.queue_stats();
        if pending > 0 && pending % 10 == 0 {
            tracing::warn!(pending, capacity, "dispatcher queue depth climbing, possible worker starvation");
        }

        for plugin in &self.plugins {
            plugin.utility().await;
        }
    }

    /// Graceful shutdown (spec §5 "Cancellation"): injects `ha_stop`, stops
    /// every plugin, wakes the main/utility loops, and terminates every app.
    pub async fn stop(&self) {
        self.kernel.process_event(HA_STOP_EVENT, serde_json::json!({}));
        for plugin in &self.plugins {
            plugin.stop().await;
        }
        for tx in self.plugin_shutdowns.lock().drain(..) {
            let _ = tx.send(());
        }
        self.shutdown.notify_waiters();
        self.lifecycle.terminate_all();
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
