//! Property-based tests for the outbox store
//!
//! For any sequence of mutations captured while offline, the outbox holds
//! exactly that many entries and yields them back in enqueue order.

use marksync::api::HttpMethod;
use marksync::outbox::OutboxStore;
use proptest::prelude::*;
use serde_json::json;

/// One queued write, generated from a small shape space
#[derive(Debug, Clone)]
struct QueuedWrite {
    method: HttpMethod,
    resource_path: String,
    payload: i64,
}

fn queued_write() -> impl Strategy<Value = QueuedWrite> {
    (0u8..4, 1i64..1000, any::<i64>()).prop_map(|(verb, target, payload)| {
        let (method, resource_path) = match verb {
            0 => (HttpMethod::Post, "bookmarks/".to_string()),
            1 => (HttpMethod::Put, format!("bookmarks/{}/", target)),
            2 => (HttpMethod::Patch, format!("bookmarks/{}/", target)),
            _ => (HttpMethod::Delete, format!("bookmarks/{}/", target)),
        };
        QueuedWrite {
            method,
            resource_path,
            payload,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_outbox_preserves_count_and_order(writes in prop::collection::vec(queued_write(), 0..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = OutboxStore::open(&dir.path().join("outbox.db")).await.unwrap();

            for write in &writes {
                store
                    .enqueue(&write.resource_path, write.method, &json!({"seq": write.payload}))
                    .await
                    .unwrap();
            }

            let entries = store.list_all_ordered().await.unwrap();
            assert_eq!(entries.len(), writes.len());

            for (entry, write) in entries.iter().zip(&writes) {
                assert_eq!(entry.resource_path, write.resource_path);
                assert_eq!(entry.method, write.method);
                assert_eq!(entry.body["seq"].as_i64().unwrap(), write.payload);
            }

            // Ids ascend with enqueue order and are assigned exactly once.
            let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(ids, sorted);
        });
    }

    #[test]
    fn test_partial_removal_keeps_relative_order(
        writes in prop::collection::vec(queued_write(), 1..15),
        removals in prop::collection::vec(any::<prop::sample::Index>(), 0..5),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = OutboxStore::open(&dir.path().join("outbox.db")).await.unwrap();

            let mut ids = Vec::new();
            for write in &writes {
                let id = store
                    .enqueue(&write.resource_path, write.method, &json!({"seq": write.payload}))
                    .await
                    .unwrap();
                ids.push(id);
            }

            let mut removed = Vec::new();
            for index in &removals {
                let id = ids[index.index(ids.len())];
                if !removed.contains(&id) {
                    store.remove(id).await.unwrap();
                    removed.push(id);
                }
            }

            let expected: Vec<i64> = ids.iter().copied().filter(|id| !removed.contains(id)).collect();
            let remaining: Vec<i64> = store
                .list_all_ordered()
                .await
                .unwrap()
                .iter()
                .map(|e| e.id)
                .collect();
            assert_eq!(remaining, expected);
        });
    }
}
