// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn saves_and_looks_up_evaluations() {
    let store = MemoryStore::new();
    store
        .save_evaluation("eval-1", &json!({"path": "/src"}), &json!({"ok": true}), 100)
        .await
        .unwrap();

    let record = store.get_evaluation("eval-1").await.unwrap().unwrap();
    assert_eq!(record.result, Some(json!({"ok": true})));
    assert!(!record.is_failed());
    assert!(store.get_evaluation("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_save_records_error() {
    let store = MemoryStore::new();
    store
        .save_failed_evaluation(
            "eval-1",
            &json!({}),
            &JobError::new("boom", "EVALUATION_ERROR"),
            100,
        )
        .await
        .unwrap();

    let record = store.get_evaluation("eval-1").await.unwrap().unwrap();
    assert!(record.is_failed());
    assert_eq!(record.error.unwrap().code, "EVALUATION_ERROR");
}

#[tokio::test]
async fn recent_returns_newest_first() {
    let store = MemoryStore::new();
    for i in 0..5 {
        store
            .save_evaluation(&format!("eval-{i}"), &json!({}), &json!({}), i)
            .await
            .unwrap();
    }
    let recent = store.recent_evaluations(2).await.unwrap();
    assert_eq!(recent[0].id, "eval-4");
    assert_eq!(recent[1].id, "eval-3");
}

#[tokio::test]
async fn link_sets_result_evaluation() {
    let store = MemoryStore::new();
    store
        .save_remediation("rem-1", &json!({}), &json!({"patched": 3}), 100)
        .await
        .unwrap();
    store
        .link_result_evaluation("rem-1", "eval-2")
        .await
        .unwrap();

    let record = store.get_remediation("rem-1").await.unwrap().unwrap();
    assert_eq!(record.result_evaluation_id.as_deref(), Some("eval-2"));

    let missing = store.link_result_evaluation("rem-9", "eval-2").await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn injected_failures_surface_as_backend_errors() {
    let store = MemoryStore::new();
    store.set_fail_saves(true);
    let err = store
        .save_evaluation("eval-1", &json!({}), &json!({}), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
    assert_eq!(store.evaluation_count(), 0);

    store.set_fail_saves(false);
    store
        .save_evaluation("eval-1", &json!({}), &json!({}), 1)
        .await
        .unwrap();
    assert_eq!(store.evaluation_count(), 1);
}
