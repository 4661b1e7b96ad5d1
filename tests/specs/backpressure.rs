//! Admission cap: queued ∪ running is bounded by maxQueueSize.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vet_core::JobRequest;
use vet_engine::test_support::ScriptedEngine;
use vet_engine::{ManagerConfig, SubmitError};

#[tokio::test]
async fn third_submission_is_rejected_at_cap_two() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({})).gated(Arc::clone(&gate));
    let config = ManagerConfig {
        max_queue_size: 2,
        ..ManagerConfig::default()
    };
    let world = world(engine, config);

    let first = world.manager.submit_job(JobRequest::default()).unwrap();
    let second = world.manager.submit_job(JobRequest::default()).unwrap();
    assert_ne!(first, second);

    let err = world.manager.submit_job(JobRequest::default()).unwrap_err();
    assert_eq!(err, SubmitError::QueueFull { active: 2, max: 2 });
    assert_eq!(err.code(), "QUEUE_FULL");

    // No third job record exists.
    assert_eq!(world.manager.all_jobs().len(), 2);
    assert_eq!(world.manager.stats().active, 2);

    gate.add_permits(2);
}

#[tokio::test]
async fn capacity_frees_up_after_terminal_states() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({})).gated(Arc::clone(&gate));
    let config = ManagerConfig {
        max_queue_size: 1,
        ..ManagerConfig::default()
    };
    let world = world(engine, config);

    let first = world.manager.submit_job(JobRequest::default()).unwrap();
    assert!(world.manager.submit_job(JobRequest::default()).is_err());

    gate.add_permits(1);
    wait_status(&world, &first, vet_core::JobStatus::Completed).await;

    // Terminal jobs no longer count against admission.
    gate.add_permits(1);
    let second = world.manager.submit_job(JobRequest::default()).unwrap();
    wait_status(&world, &second, vet_core::JobStatus::Completed).await;
}
