// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tagged_variants_round_trip_through_json() {
    let queries = [
        Query::Ping,
        Query::ListApps,
        Query::GetCallbacks { app: "porch_light".to_string() },
        Query::GetSchedule { app: "porch_light".to_string() },
        Query::GetSunInfo,
        Query::GetQueueDepth,
        Query::ReloadApps,
        Query::StopApp { app: "porch_light".to_string() },
        Query::Stop,
    ];

    for query in queries {
        let json = serde_json::to_string(&query).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}

#[test]
fn the_tag_field_names_the_variant() {
    let json = serde_json::to_value(Query::GetCallbacks { app: "porch_light".to_string() }).unwrap();
    assert_eq!(json["type"], "GetCallbacks");
    assert_eq!(json["app"], "porch_light");
}
