// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kwargs: the free-form argument bag attached to a callback registration.
//!
//! Kept as a plain map rather than a typed struct because users attach
//! arbitrary keys (constraints, their own bookkeeping) alongside the
//! recognized ones. Before a kwargs map reaches user code it is sanitized
//! (spec §4.6): internal bookkeeping keys are stripped so apps only see
//! what they passed in plus whatever the kernel computed for them.

use serde_json::Value;
use std::collections::BTreeMap;

/// Keys the kernel uses for its own bookkeeping and strips before handing
/// kwargs to user code (spec §4.6).
const BOOKKEEPING_KEYS: &[&str] = &[
    "handle",
    "attribute",
    "old",
    "new",
    "duration",
    "interval",
    "random_start",
    "random_end",
    "offset",
];

fn is_bookkeeping_key(key: &str) -> bool {
    BOOKKEEPING_KEYS.contains(&key) || key.starts_with("constrain_")
}

pub type Kwargs = BTreeMap<String, Value>;

/// Returns a copy of `kwargs` with bookkeeping keys removed, safe to pass
/// into a timer, attr, or event callback.
pub fn sanitize(kwargs: &Kwargs) -> Kwargs {
    kwargs.iter().filter(|(k, _)| !is_bookkeeping_key(k)).map(|(k, v)| (k.clone(), v.clone())).collect()
}

pub fn get_str<'a>(kwargs: &'a Kwargs, key: &str) -> Option<&'a str> {
    kwargs.get(key).and_then(|v| v.as_str())
}

pub fn get_bool(kwargs: &Kwargs, key: &str) -> Option<bool> {
    kwargs.get(key).and_then(|v| v.as_bool())
}

pub fn get_i64(kwargs: &Kwargs, key: &str) -> Option<i64> {
    kwargs.get(key).and_then(|v| v.as_i64())
}

#[cfg(test)]
#[path = "kwargs_tests.rs"]
mod tests;
