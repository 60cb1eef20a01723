// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn split_separates_device_and_entity() {
    let id = EntityId::new("light.porch");
    assert_eq!(id.split(), Some(("light", "porch")));
    assert_eq!(id.device(), Some("light"));
}

#[test]
fn split_is_none_without_a_dot() {
    let id = EntityId::new("global");
    assert_eq!(id.split(), None);
    assert_eq!(id.device(), None);
}

#[test]
fn get_field_prefers_top_level_state() {
    let snapshot = EntitySnapshot::new("on").with_attribute("state", "stale");
    assert_eq!(snapshot.get_field("state"), Some(Value::String("on".to_string())));
}

#[test]
fn get_field_falls_back_to_attributes() {
    let snapshot = EntitySnapshot::new("on").with_attribute("brightness", 80);
    assert_eq!(snapshot.get_field("brightness"), Some(Value::from(80)));
    assert_eq!(snapshot.get_field("missing"), None);
}

fn device_or_entity_fragment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_map(|s: String| s)
}

proptest! {
    /// `EntityId::new(format!("{device}.{entity}"))` must always split back
    /// into exactly the fragments it was built from, for any fragment that
    /// itself contains no dot (spec §3's `"<device>.<entity>"` key format).
    #[test]
    fn device_dot_entity_round_trips_through_split(
        device in device_or_entity_fragment(),
        entity in device_or_entity_fragment(),
    ) {
        let id = EntityId::new(format!("{device}.{entity}"));
        prop_assert_eq!(id.split(), Some((device.as_str(), entity.as_str())));
    }
}
