// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use autod_core::test_support::{snapshot, strategies::arb_entity_snapshot};
use autod_core::EntityId;
use chrono_tz::UTC;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashMap;

fn ctx_at(now_ts: i64, store: &StateStore) -> ConstraintContext<'_> {
    ConstraintContext {
        now_ts,
        timezone: UTC,
        sun: SunState { next_rising: 100_000, next_setting: 150_000 },
        state: store,
        default_namespace: Namespace::new("hass"),
    }
}

fn store_with(entity: &str, state: &str) -> StateStore {
    let store = StateStore::new();
    let mut seed = HashMap::new();
    seed.insert(EntityId::new(entity), snapshot(state));
    store.install_namespace(Namespace::new("hass"), seed).unwrap();
    store
}

#[test]
fn constrain_input_boolean_default_expects_on() {
    let store = store_with("input_boolean.porch", "on");
    let ctx = ctx_at(0, &store);
    assert!(check_constraint(&ctx, "constrain_input_boolean", "input_boolean.porch", &AlwaysPresent));

    let store_off = store_with("input_boolean.porch", "off");
    let ctx_off = ctx_at(0, &store_off);
    assert!(!check_constraint(&ctx_off, "constrain_input_boolean", "input_boolean.porch", &AlwaysPresent));
}

#[test]
fn constrain_input_boolean_explicit_expected_state() {
    let store = store_with("input_boolean.porch", "off");
    let ctx = ctx_at(0, &store);
    assert!(check_constraint(&ctx, "constrain_input_boolean", "input_boolean.porch,off", &AlwaysPresent));
}

#[test]
fn constrain_input_select_checks_membership() {
    let store = store_with("input_select.mode", "away");
    let ctx = ctx_at(0, &store);
    assert!(check_constraint(&ctx, "constrain_input_select", "input_select.mode,home,away", &AlwaysPresent));
    assert!(!check_constraint(&ctx, "constrain_input_select", "input_select.mode,home,vacation", &AlwaysPresent));
}

#[test]
fn constrain_days_matches_current_weekday() {
    let store = StateStore::new();
    // 2026-08-01 is a Saturday.
    let ts = chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
    let ctx = ctx_at(ts, &store);
    assert!(check_constraint(&ctx, "constrain_days", "saturday,sunday", &AlwaysPresent));
    assert!(!check_constraint(&ctx, "constrain_days", "monday,tuesday", &AlwaysPresent));
}

#[test]
fn midnight_spanning_window_passes_late_evening() {
    let store = StateStore::new();
    // 23:30 UTC on any date.
    let ts = chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap().and_hms_opt(23, 30, 0).unwrap().and_utc().timestamp();
    let ctx = ctx_at(ts, &store);
    assert!(now_is_between(&ctx, "22:00:00", "02:00:00").unwrap());
}

#[test]
fn midnight_spanning_window_fails_mid_morning() {
    let store = StateStore::new();
    let ts = chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap().and_hms_opt(3, 0, 0).unwrap().and_utc().timestamp();
    let ctx = ctx_at(ts, &store);
    assert!(!now_is_between(&ctx, "22:00:00", "02:00:00").unwrap());
}

#[test]
fn parse_time_accepts_sunrise_with_offset() {
    let store = StateStore::new();
    let ctx = ctx_at(0, &store);
    // next_rising = 100_000s -> local seconds-of-day computed the same way.
    let plain = parse_time(&ctx, "sunrise").unwrap();
    let offset = parse_time(&ctx, "sunrise+00:10:00").unwrap();
    assert_eq!(offset, (plain + 600) % 86_400);
}

#[test]
fn parse_time_rejects_garbage() {
    let store = StateStore::new();
    let ctx = ctx_at(0, &store);
    assert!(parse_time(&ctx, "not-a-time").is_err());
}

#[test]
fn passes_all_ands_constraints_together() {
    let store = store_with("input_boolean.porch", "on");
    let ts = chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
    let ctx = ctx_at(ts, &store);
    let mut kw = Kwargs::new();
    kw.insert("constrain_input_boolean".into(), json!("input_boolean.porch"));
    kw.insert("constrain_days".into(), json!("saturday"));
    assert!(passes_all(&ctx, &kw, &AlwaysPresent).unwrap());

    kw.insert("constrain_days".into(), json!("monday"));
    assert!(!passes_all(&ctx, &kw, &AlwaysPresent).unwrap());
}

proptest! {
    /// Whatever state an entity is seeded with, `constrain_input_boolean`
    /// agrees with it in full: `"on"` always passes, anything else always
    /// fails (spec §4.5), regardless of what attributes ride along with it.
    #[test]
    fn constrain_input_boolean_matches_the_seeded_state(snap in arb_entity_snapshot()) {
        let store = StateStore::new();
        let mut seed = HashMap::new();
        seed.insert(EntityId::new("input_boolean.porch"), snap.clone());
        store.install_namespace(Namespace::new("hass"), seed).unwrap();

        let ctx = ctx_at(0, &store);
        let passes = check_constraint(&ctx, "constrain_input_boolean", "input_boolean.porch", &AlwaysPresent);
        prop_assert_eq!(passes, snap.state == "on");
    }
}
