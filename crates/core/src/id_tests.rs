// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn handle_id_carries_its_prefix() {
    let h = HandleId::new();
    assert!(h.as_str().starts_with("hdl-"));
}

#[test]
fn handle_id_round_trips_through_string() {
    let h = HandleId::new();
    let parsed = HandleId::from_string(h.as_str());
    assert_eq!(h, parsed);
}

#[test]
fn handle_ids_are_unique() {
    let a = HandleId::new();
    let b = HandleId::new();
    assert_ne!(a, b);
}

#[test]
fn idbuf_borrows_as_str_for_map_lookup() {
    use std::collections::HashMap;
    let mut map: HashMap<IdBuf, u32> = HashMap::new();
    map.insert(IdBuf::new("hdl-abc"), 1);
    assert_eq!(map.get("hdl-abc"), Some(&1));
}
