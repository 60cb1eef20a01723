// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Constraint evaluation: per-app and per-callback gating rules (spec §4.5).
//!
//! Pure functions over a snapshot of time/sun/state — no locks of its own.
//! `Dispatcher` calls in here while holding only whatever lock the state
//! store itself takes (spec §5: the scheduler's firing pass may acquire
//! state for constraint checks, but never re-acquire schedule or
//! callbacks).

use crate::sun::local_from_ts;
use autod_core::kwargs::Kwargs;
use autod_core::{KernelError, Namespace, SunEvent, SunState};
use autod_storage::{GetField, StateStore};
use chrono::{Datelike, Timelike, Weekday};
use chrono_tz::Tz;

/// Everything a constraint check needs to know about "now".
pub struct ConstraintContext<'a> {
    pub now_ts: i64,
    pub timezone: Tz,
    pub sun: SunState,
    pub state: &'a StateStore,
    /// Namespace `constrain_input_boolean`/`constrain_input_select` resolve
    /// entity ids against.
    pub default_namespace: Namespace,
}

/// Parses `"HH:MM:SS"`, `"sunrise"`, `"sunset"`, or `"sunrise±HH:MM:SS"` /
/// `"sunset±HH:MM:SS"` into seconds-since-midnight local time (spec §4.5).
pub fn parse_time(ctx: &ConstraintContext<'_>, time_str: &str) -> Result<u32, KernelError> {
    let time_str = time_str.trim();

    if let Ok(secs) = autod_core::time_fmt::parse_clock_str(time_str) {
        return Ok(secs);
    }

    if time_str == "sunrise" {
        return Ok(local_seconds_of_day(ctx.timezone, ctx.sun.get(SunEvent::NextRising)));
    }
    if time_str == "sunset" {
        return Ok(local_seconds_of_day(ctx.timezone, ctx.sun.get(SunEvent::NextSetting)));
    }

    for (prefix, event) in [("sunrise", SunEvent::NextRising), ("sunset", SunEvent::NextSetting)] {
        if let Some(rest) = time_str.strip_prefix(prefix) {
            let rest = rest.trim_start();
            let mut chars = rest.chars();
            if let Some(sign @ ('+' | '-')) = chars.next() {
                let offset = chars.as_str().trim();
                let delta = autod_core::time_fmt::parse_clock_str(offset)? as i64;
                let base = ctx.sun.get(event);
                let signed = if sign == '+' { base + delta } else { base - delta };
                return Ok(local_seconds_of_day(ctx.timezone, signed));
            }
        }
    }

    Err(KernelError::InvalidTimeString(time_str.to_string()))
}

fn local_seconds_of_day(tz: Tz, ts: i64) -> u32 {
    local_from_ts(tz, ts).num_seconds_from_midnight()
}

/// `now_is_between(start, end)` per spec §4.5, §8: true iff current
/// time-of-day lies in the (possibly midnight-spanning) inclusive interval.
pub fn now_is_between(ctx: &ConstraintContext<'_>, start: &str, end: &str) -> Result<bool, KernelError> {
    let start_secs = parse_time(ctx, start)?;
    let end_secs = parse_time(ctx, end)?;
    let now_secs = local_seconds_of_day(ctx.timezone, ctx.now_ts);

    if end_secs < start_secs {
        // Spans midnight: if now is before both boundaries, treat it as
        // tomorrow's occurrence of `now` for the comparison.
        let now_secs = if now_secs < start_secs && now_secs < end_secs { now_secs + 86_400 } else { now_secs };
        let end_secs = end_secs as i64 + 86_400;
        Ok(start_secs as i64 <= now_secs as i64 && now_secs as i64 <= end_secs)
    } else {
        Ok(start_secs <= now_secs && now_secs <= end_secs)
    }
}

fn weekday_name(w: Weekday) -> &'static str {
    match w {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn today_is_constrained(ctx: &ConstraintContext<'_>, days: &str) -> bool {
    let local = local_from_ts(ctx.timezone, ctx.now_ts);
    let today = weekday_name(local.weekday());
    days.split(',').map(|d| d.trim().to_ascii_lowercase()).any(|d| d == today)
}

fn state_string(ctx: &ConstraintContext<'_>, entity_id: &str) -> Option<String> {
    let (device, entity) = entity_id.split_once('.')?;
    match ctx.state.get(&ctx.default_namespace, Some(device), Some(entity), None)? {
        GetField::State(s) => Some(s),
        _ => None,
    }
}

/// Evaluates one `constrain_*` key/value pair. Unrecognized keys pass
/// (they are ordinary app config, not constraints).
pub fn check_constraint(ctx: &ConstraintContext<'_>, key: &str, value: &str, presence: &dyn Presence) -> bool {
    match key {
        "constrain_input_boolean" => {
            let mut parts = value.splitn(2, ',');
            let entity = parts.next().unwrap_or_default();
            let expected = parts.next().unwrap_or("on");
            match state_string(ctx, entity) {
                Some(actual) => actual == expected,
                None => true,
            }
        }
        "constrain_input_select" => {
            let mut parts = value.split(',');
            let Some(entity) = parts.next() else { return true };
            let options: Vec<&str> = parts.collect();
            match state_string(ctx, entity) {
                Some(actual) => options.iter().any(|o| *o == actual),
                None => true,
            }
        }
        "constrain_presence" => match value {
            "everyone" => presence.everyone_home(),
            "anyone" => presence.anyone_home(),
            "noone" => presence.noone_home(),
            _ => true,
        },
        "constrain_days" => !today_is_constrained(ctx, value),
        _ => true,
    }
}

/// Presence helper, implemented by whatever plugin tracks device trackers.
/// A host with no presence plugin can supply the permissive default below.
pub trait Presence: Send + Sync {
    fn everyone_home(&self) -> bool;
    fn anyone_home(&self) -> bool;
    fn noone_home(&self) -> bool;
}

/// Presence is vacuously satisfied when nothing tracks it.
pub struct AlwaysPresent;

impl Presence for AlwaysPresent {
    fn everyone_home(&self) -> bool {
        true
    }
    fn anyone_home(&self) -> bool {
        true
    }
    fn noone_home(&self) -> bool {
        true
    }
}

/// Evaluates every `constrain_*` key across `kwargs` plus the
/// `constrain_start_time`/`constrain_end_time` window, ANDed together
/// (spec §4.5, §4.6 step 1).
pub fn passes_all(ctx: &ConstraintContext<'_>, kwargs: &Kwargs, presence: &dyn Presence) -> Result<bool, KernelError> {
    for (key, value) in kwargs {
        if !key.starts_with("constrain_") || key == "constrain_start_time" || key == "constrain_end_time" {
            continue;
        }
        let Some(value) = value.as_str() else { continue };
        if !check_constraint(ctx, key, value, presence) {
            return Ok(false);
        }
    }

    let start = kwargs.get("constrain_start_time").and_then(|v| v.as_str());
    let end = kwargs.get("constrain_end_time").and_then(|v| v.as_str());
    if start.is_some() || end.is_some() {
        let start = start.unwrap_or("00:00:00");
        let end = end.unwrap_or("23:59:59");
        if !now_is_between(ctx, start, end)? {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
#[path = "constraint_tests.rs"]
mod tests;
