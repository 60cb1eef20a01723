// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use autod_core::test_support::AppConfigEntryBuilder;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

struct RecordingApp {
    inits: Arc<AtomicUsize>,
    terms: Arc<AtomicUsize>,
}

impl App for RecordingApp {
    fn initialize(&self) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn terminate(&self) {
        self.terms.fetch_add(1, Ordering::SeqCst);
    }
}

fn config_with(entries: &[(&str, &str, Option<&str>)]) -> BTreeMap<AppName, AppConfigEntry> {
    entries
        .iter()
        .map(|(name, module, deps)| {
            let mut builder = AppConfigEntryBuilder::new(*name, *module);
            if let Some(d) = deps {
                builder = builder.dependencies(*d);
            }
            (AppName::new(*name), builder.build())
        })
        .collect()
}

#[test]
fn loading_a_module_initializes_every_app_bound_to_it() {
    let inits = Arc::new(AtomicUsize::new(0));
    let terms = Arc::new(AtomicUsize::new(0));
    let inits2 = inits.clone();
    let terms2 = terms.clone();
    let mut factories: BTreeMap<String, AppFactory> = BTreeMap::new();
    factories.insert(
        "porch_light".to_string(),
        Arc::new(move |_name, _id, _cfg| Arc::new(RecordingApp { inits: inits2.clone(), terms: terms2.clone() }) as Arc<dyn App>),
    );
    let terminated_names = Arc::new(Mutex::new(Vec::new()));
    let tn = terminated_names.clone();
    let lifecycle = Lifecycle::new(factories, Arc::new(move |name| tn.lock().push(name.clone())));

    let config = config_with(&[("porch_light", "porch_light", None)]);
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("porch_light.rs"), "").unwrap();

    let loaded = lifecycle.sync(dir.path(), &config).unwrap();
    assert_eq!(loaded, vec![AppName::new("porch_light")]);
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert!(lifecycle.is_loaded(&AppName::new("porch_light")));
}

#[test]
fn reloading_a_module_terminates_the_old_instance_first() {
    let inits = Arc::new(AtomicUsize::new(0));
    let terms = Arc::new(AtomicUsize::new(0));
    let inits2 = inits.clone();
    let terms2 = terms.clone();
    let mut factories: BTreeMap<String, AppFactory> = BTreeMap::new();
    factories.insert(
        "a".to_string(),
        Arc::new(move |_name, _id, _cfg| Arc::new(RecordingApp { inits: inits2.clone(), terms: terms2.clone() }) as Arc<dyn App>),
    );
    let lifecycle = Lifecycle::new(factories, Arc::new(|_name| {}));
    let config = config_with(&[("a", "a", None)]);

    lifecycle.reload_all(&config).unwrap();
    let first_id = lifecycle.current_id(&AppName::new("a")).unwrap();
    lifecycle.reload_all(&config).unwrap();
    let second_id = lifecycle.current_id(&AppName::new("a")).unwrap();

    assert_ne!(first_id, second_id, "reload must mint a fresh AppId (spec stale-callback guard)");
    assert_eq!(terms.load(Ordering::SeqCst), 1);
    assert_eq!(inits.load(Ordering::SeqCst), 2);
}

#[test]
fn dependency_order_is_honored_across_modules() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut factories: BTreeMap<String, AppFactory> = BTreeMap::new();
    for module in ["a", "b"] {
        let order2 = order.clone();
        let module = module.to_string();
        factories.insert(
            module.clone(),
            Arc::new(move |_name, _id, _cfg| {
                order2.lock().push(module.clone());
                Arc::new(RecordingApp { inits: Arc::new(AtomicUsize::new(0)), terms: Arc::new(AtomicUsize::new(0)) }) as Arc<dyn App>
            }),
        );
    }
    let lifecycle = Lifecycle::new(factories, Arc::new(|_name| {}));
    let config = config_with(&[("app_b", "b", Some("a")), ("app_a", "a", None)]);

    lifecycle.reload_all(&config).unwrap();
    assert_eq!(*order.lock(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn circular_dependency_aborts_the_pass_without_loading_anything() {
    let factories: BTreeMap<String, AppFactory> = BTreeMap::new();
    let lifecycle = Lifecycle::new(factories, Arc::new(|_name| {}));
    let config = config_with(&[("app_a", "a", Some("b")), ("app_b", "b", Some("a"))]);

    let err = lifecycle.reload_all(&config).unwrap_err();
    assert!(matches!(err, KernelError::UnresolvedDependencies(_)));
    assert!(!lifecycle.is_loaded(&AppName::new("app_a")));
}

#[test]
fn app_constraints_reflects_the_current_config() {
    let factories: BTreeMap<String, AppFactory> = BTreeMap::new();
    let lifecycle = Lifecycle::new(factories, Arc::new(|_name| {}));
    let config: BTreeMap<AppName, AppConfigEntry> = [(
        AppName::new("porch_light"),
        AppConfigEntryBuilder::new("PorchLight", "porch_light").extra("constrain_input_boolean", "input_boolean.enabled").build(),
    )]
    .into_iter()
    .collect();

    // current_config is populated even when no module is due to load.
    let _ = lifecycle.sync(tempfile::tempdir().unwrap().path(), &config);
    let constraints = lifecycle.app_constraints(&AppName::new("porch_light"));
    assert_eq!(constraints.get("constrain_input_boolean").and_then(|v| v.as_str()), Some("input_boolean.enabled"));
}
