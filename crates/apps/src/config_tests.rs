// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn parses_app_entries_and_skips_reserved_keys() {
    let doc = json!({
        "AppDaemon": { "time_zone": "America/Chicago" },
        "porch_light": {
            "class": "PorchLight",
            "module": "porch_light",
            "constrain_input_boolean": "input_boolean.porch_enabled",
        },
        "kitchen_light": {
            "class": "KitchenLight",
            "module": "kitchen_light",
            "dependencies": "porch_light",
        },
    });
    let apps = from_document(doc).unwrap();
    assert_eq!(apps.len(), 2);
    assert!(!apps.contains_key(&AppName::new("AppDaemon")));

    let porch = &apps[&AppName::new("porch_light")];
    assert_eq!(porch.class, "PorchLight");
    assert_eq!(porch.module, "porch_light");
    assert_eq!(porch.get_str("constrain_input_boolean"), Some("input_boolean.porch_enabled"));

    let kitchen = &apps[&AppName::new("kitchen_light")];
    assert_eq!(kitchen.dependency_modules(), vec!["porch_light".to_string()]);
}

#[test]
fn missing_required_key_is_an_invalid_config_error() {
    let doc = json!({ "porch_light": { "class": "PorchLight" } });
    let err = from_document(doc).unwrap_err();
    assert!(matches!(err, KernelError::InvalidAppConfig(_)));
}

#[test]
fn non_mapping_document_is_rejected() {
    let err = from_document(json!(["a", "b"])).unwrap_err();
    assert!(matches!(err, KernelError::InvalidAppConfig(_)));
}
