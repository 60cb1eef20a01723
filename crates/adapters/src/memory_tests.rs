// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use autod_core::test_support::snapshot;
use autod_core::KernelError;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingKernel {
    updates: StdMutex<Vec<(Namespace, String, Value)>>,
}

impl KernelHandle for RecordingKernel {
    fn install_namespace(&self, _namespace: Namespace, _seed: HashMap<EntityId, EntitySnapshot>) -> Result<(), KernelError> {
        Ok(())
    }

    fn state_update(&self, namespace: &Namespace, event_type: &str, data: &Value) {
        self.updates.lock().unwrap().push((namespace.clone(), event_type.to_string(), data.clone()));
    }
}

#[tokio::test]
async fn get_complete_state_returns_the_seed() {
    let mut seed = HashMap::new();
    seed.insert(EntityId::new("light.kitchen"), snapshot("on"));
    let plugin = MemoryPlugin::new(Namespace::new("mem"), seed.clone());
    assert_eq!(plugin.get_complete_state().await.unwrap(), seed);
}

#[tokio::test]
async fn get_updates_forwards_fed_items_until_shutdown() {
    let plugin = Arc::new(MemoryPlugin::new(Namespace::new("mem"), HashMap::new()));
    let recorder = Arc::new(RecordingKernel::default());
    let kernel: Arc<dyn KernelHandle> = recorder.clone();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let feed = plugin.feed();

    let plugin2 = plugin.clone();
    let task = tokio::spawn(async move { plugin2.get_updates(kernel, shutdown_rx).await });

    feed.send(("state_changed".to_string(), serde_json::json!({ "entity_id": "light.kitchen" }))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let _ = shutdown_tx.send(());
    task.await.unwrap();

    let recorded = recorder.updates.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1, "state_changed");
}

#[tokio::test]
async fn utility_increments_call_count() {
    let plugin = MemoryPlugin::new(Namespace::new("mem"), HashMap::new());
    plugin.utility().await;
    plugin.utility().await;
    assert_eq!(plugin.utility_call_count(), 2);
}
