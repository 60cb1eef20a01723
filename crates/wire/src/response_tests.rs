// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tagged_variants_round_trip_through_json() {
    let responses = [
        Response::Pong,
        Response::Ok,
        Response::Error { message: "no such app".to_string() },
        Response::Apps { names: vec!["porch_light".to_string()] },
        Response::Callbacks {
            entries: vec![CallbackEntry {
                handle: "hdl-1".to_string(),
                kind: "state".to_string(),
                target: "light.porch".to_string(),
                attribute: "state".to_string(),
            }],
        },
        Response::Schedule {
            entries: vec![ScheduleEntry { handle: "hdl-2".to_string(), next_fire: 1_700_000_000, interval: 60, inactive: false }],
        },
        Response::SunInfo { sunrise: 1_700_000_000, sunset: 1_700_040_000 },
        Response::QueueDepth { pending: 3, capacity: 256 },
        Response::ShuttingDown,
    ];

    for response in responses {
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}

#[test]
fn error_variant_carries_its_message() {
    let json = serde_json::to_value(Response::Error { message: "no such app".to_string() }).unwrap();
    assert_eq!(json["type"], "Error");
    assert_eq!(json["message"], "no such app");
}
