//! Batch coordination: sequential children and rate-limit accounting.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vet_core::SequentialIdGen;
use vet_engine::test_support::{wait_until, ScriptedEngine};
use vet_engine::{BatchManager, ManagerConfig, RateLimiter};

fn batch_world(
    engine: ScriptedEngine,
    daily_limit: u32,
) -> (World, Arc<BatchManager<vet_core::FakeClock, SequentialIdGen>>) {
    let world = world(engine, ManagerConfig::default());
    let limiter = Arc::new(RateLimiter::new(daily_limit, world.clock.clone()));
    let batches = BatchManager::new(
        Arc::clone(&world.manager),
        limiter,
        SequentialIdGen::new("batch"),
    );
    (world, batches)
}

#[tokio::test]
async fn children_are_submitted_one_after_another() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({})).gated(Arc::clone(&gate));
    let (_world, batches) = batch_world(engine, 0);

    let urls: Vec<String> = (0..3)
        .map(|i| format!("https://git.example/repo-{i}.git"))
        .collect();
    let batch_id = batches.submit_batch(urls, json!({"mode": "quick"})).unwrap();

    {
        let batches = Arc::clone(&batches);
        let batch_id = batch_id.clone();
        wait_until("first child to run", move || {
            batches
                .batch_status(&batch_id)
                .is_some_and(|s| s.running == 1)
        })
        .await;
    }
    let mid = batches.batch_status(&batch_id).unwrap();
    assert_eq!(mid.total_urls, 3);
    assert_eq!(mid.pending, 2);
    assert!(!mid.is_finished);
    // Later URLs have not even been submitted yet.
    assert!(mid.jobs[1].job_id.is_none());
    assert!(mid.jobs[2].job_id.is_none());

    gate.add_permits(3);
    {
        let batches = Arc::clone(&batches);
        let batch_id = batch_id.clone();
        wait_until("batch to finish", move || {
            batches
                .batch_status(&batch_id)
                .is_some_and(|s| s.is_finished)
        })
        .await;
    }

    let done = batches.batch_status(&batch_id).unwrap();
    assert_eq!(done.completed, 3);
    assert_eq!(done.failed, 0);
    assert_eq!(done.pending, 0);
}

#[tokio::test]
async fn denied_children_fail_with_rate_limited() {
    let engine = ScriptedEngine::ok(json!({}));
    let (world, batches) = batch_world(engine, 2);

    let urls: Vec<String> = (0..4)
        .map(|i| format!("https://git.example/repo-{i}.git"))
        .collect();
    let batch_id = batches.submit_batch(urls, json!({})).unwrap();

    {
        let batches = Arc::clone(&batches);
        let batch_id = batch_id.clone();
        wait_until("batch to finish", move || {
            batches
                .batch_status(&batch_id)
                .is_some_and(|s| s.is_finished)
        })
        .await;
    }

    let done = batches.batch_status(&batch_id).unwrap();
    assert_eq!(done.completed, 2);
    assert_eq!(done.failed, 2);
    assert_eq!(done.jobs[2].error.as_deref(), Some("RATE_LIMITED"));
    assert_eq!(done.jobs[3].error.as_deref(), Some("RATE_LIMITED"));

    // Only the admitted children exist as jobs.
    assert_eq!(world.manager.all_jobs().len(), 2);
}
