// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn sanitize_strips_bookkeeping_keys() {
    let mut kwargs = Kwargs::new();
    kwargs.insert("handle".into(), json!("hdl-1"));
    kwargs.insert("duration".into(), json!(5));
    kwargs.insert("constrain_days".into(), json!("mon,tue"));
    kwargs.insert("brightness".into(), json!(128));

    let clean = sanitize(&kwargs);
    assert_eq!(clean.len(), 1);
    assert_eq!(clean.get("brightness"), Some(&json!(128)));
}

#[test]
fn sanitize_keeps_user_keys_untouched() {
    let mut kwargs = Kwargs::new();
    kwargs.insert("room".into(), json!("kitchen"));
    let clean = sanitize(&kwargs);
    assert_eq!(clean, kwargs);
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z][a-z0-9_]{0,10}".prop_map(|s: String| s),
        1 => Just("handle".to_string()),
        1 => Just("duration".to_string()),
        1 => Just("constrain_days".to_string()),
    ]
}

proptest! {
    /// Sanitizing is idempotent and leaves no bookkeeping key behind,
    /// regardless of which user keys happen to collide with one (spec
    /// §4.6: a callback only ever sees what it passed in plus kernel-
    /// computed fields, never raw bookkeeping).
    #[test]
    fn sanitize_is_idempotent_and_bookkeeping_free(pairs in prop::collection::vec((arb_key(), 0i64..100), 0..20)) {
        let kwargs: Kwargs = pairs.into_iter().map(|(k, v)| (k, json!(v))).collect();
        let once = sanitize(&kwargs);
        let twice = sanitize(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.keys().all(|k| !is_bookkeeping_key(k)));
    }
}
