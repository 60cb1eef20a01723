// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The timer scheduler: per-app schedule entries, sun-relative re-pinning,
//! and the firing pass (spec §3, §4.4).
//!
//! One mutex held for the duration of `insert`/`cancel_timer`/`info_timer`
//! AND around the whole firing pass (spec §5, lock #3 "schedule"). The
//! firing pass itself must never re-acquire this lock — callers take the
//! returned due entries and dispatch them after releasing it.

use autod_core::kwargs::{self, Kwargs};
use autod_core::{AppId, AppName, HandleId, KernelError, SunEvent};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

pub type ScheduleCallbackFn = Arc<dyn Fn(Kwargs) + Send + Sync>;

#[derive(Clone)]
pub struct ScheduleEntry {
    pub app: AppName,
    pub app_id: AppId,
    pub basetime: i64,
    pub offset: i64,
    pub timestamp: i64,
    pub interval: i64,
    pub repeat: bool,
    pub sun_event: Option<SunEvent>,
    pub kwargs: Kwargs,
    pub inactive: bool,
    pub function: ScheduleCallbackFn,
}

/// Resolves a registration's `offset` from its kwargs (spec §4.4): either
/// an explicit `offset`, or a uniform draw from `[random_start, random_end]`
/// (each defaulting to 0). Combining `offset` with either random bound is a
/// domain error.
fn resolve_offset(entry_kwargs: &Kwargs) -> Result<i64, KernelError> {
    let offset = kwargs::get_i64(entry_kwargs, "offset");
    let random_start = kwargs::get_i64(entry_kwargs, "random_start");
    let random_end = kwargs::get_i64(entry_kwargs, "random_end");

    if offset.is_some() && (random_start.is_some() || random_end.is_some()) {
        return Err(KernelError::OffsetConflict);
    }

    if let Some(o) = offset {
        return Ok(o);
    }

    let a = random_start.unwrap_or(0);
    let b = random_end.unwrap_or(0);
    if a == b {
        Ok(a)
    } else {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        Ok(rand::thread_rng().gen_range(lo..=hi))
    }
}

#[derive(Default)]
pub struct Scheduler {
    by_app: Mutex<HashMap<AppName, IndexMap<HandleId, ScheduleEntry>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `insert(name, utc_base, callback, repeat, type, kwargs) -> handle`
    /// (spec §4.4).
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &self,
        app: AppName,
        app_id: AppId,
        utc_base: i64,
        function: ScheduleCallbackFn,
        repeat: bool,
        sun_event: Option<SunEvent>,
        entry_kwargs: Kwargs,
    ) -> Result<HandleId, KernelError> {
        let offset = resolve_offset(&entry_kwargs)?;
        let interval = kwargs::get_i64(&entry_kwargs, "interval").unwrap_or(0);
        let entry = ScheduleEntry {
            app: app.clone(),
            app_id,
            basetime: utc_base,
            offset,
            timestamp: utc_base + offset,
            interval,
            repeat,
            sun_event,
            kwargs: entry_kwargs,
            inactive: false,
            function,
        };
        let handle = HandleId::new();
        self.by_app.lock().entry(app).or_default().insert(handle, entry);
        Ok(handle)
    }

    pub fn cancel_timer(&self, app: &AppName, handle: HandleId) -> bool {
        let mut by_app = self.by_app.lock();
        let Some(map) = by_app.get_mut(app) else { return false };
        let removed = map.shift_remove(&handle).is_some();
        if map.is_empty() {
            by_app.remove(app);
        }
        removed
    }

    /// `(timestamp, interval, sanitized kwargs)`, or `InvalidHandle`.
    pub fn info_timer(&self, app: &AppName, handle: HandleId) -> Result<(i64, i64, Kwargs), KernelError> {
        let by_app = self.by_app.lock();
        by_app
            .get(app)
            .and_then(|m| m.get(&handle))
            .map(|e| (e.timestamp, e.interval, kwargs::sanitize(&e.kwargs)))
            .ok_or_else(|| KernelError::InvalidHandle(handle.to_string()))
    }

    pub fn remove_app(&self, app: &AppName) {
        self.by_app.lock().remove(app);
    }

    /// Firing pass (spec §4.4): for each app, entries due at or before `now`
    /// are returned (in ascending-timestamp, insertion-order-tiebroken
    /// order) and either dropped (non-repeat) or rewritten in place for
    /// their next occurrence. `next_sun` resolves the current `next_rising`
    /// / `next_setting` instant for sun-relative rewrites.
    pub fn fire(&self, now: i64, next_sun: impl Fn(SunEvent) -> i64) -> Vec<(AppName, HandleId, ScheduleEntry)> {
        let mut by_app = self.by_app.lock();
        let mut due = Vec::new();

        for (_app, entries) in by_app.iter_mut() {
            let mut ordered: Vec<HandleId> = entries.keys().copied().collect();
            ordered.sort_by_key(|h| entries.get(h).map(|e| e.timestamp).unwrap_or(i64::MAX));

            for handle in ordered {
                let Some(entry) = entries.get(&handle) else { continue };
                if entry.timestamp > now {
                    break;
                }
                due.push((entry.app.clone(), handle, entry.clone()));

                if !entry.repeat {
                    entries.shift_remove(&handle);
                    continue;
                }

                let Some(entry) = entries.get_mut(&handle) else { continue };
                if let Some(sun_event) = entry.sun_event {
                    if entry.offset < 0 {
                        entry.inactive = true;
                    } else {
                        // Re-randomize a random-offset entry on each cycle.
                        entry.offset = resolve_offset(&entry.kwargs).unwrap_or(entry.offset);
                        entry.timestamp = next_sun(sun_event) + entry.offset;
                    }
                } else {
                    entry.basetime += entry.interval;
                    entry.offset = resolve_offset(&entry.kwargs).unwrap_or(entry.offset);
                    entry.timestamp = entry.basetime + entry.offset;
                }
            }
        }

        by_app.retain(|_, entries| !entries.is_empty());
        due
    }

    /// `process_sun(event)` (spec §4.4): reifies every `inactive` entry of
    /// the matching sun type once a new instant for that event is known.
    pub fn process_sun(&self, event: SunEvent, next_instant: i64) {
        let mut by_app = self.by_app.lock();
        for entries in by_app.values_mut() {
            for entry in entries.values_mut() {
                if entry.sun_event == Some(event) && entry.inactive {
                    entry.inactive = false;
                    entry.offset = resolve_offset(&entry.kwargs).unwrap_or(entry.offset);
                    entry.timestamp = next_instant + entry.offset;
                }
            }
        }
    }

    pub fn is_empty_for(&self, app: &AppName) -> bool {
        self.by_app.lock().get(app).map(|m| m.is_empty()).unwrap_or(true)
    }

    /// Every pending entry for `app`, for diagnostic listing.
    pub fn entries_for_app(&self, app: &AppName) -> Vec<(HandleId, ScheduleEntry)> {
        self.by_app.lock().get(app).map(|m| m.iter().map(|(h, e)| (*h, e.clone())).collect()).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
