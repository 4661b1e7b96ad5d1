//! Dispatcher concurrency cap and queued → running promotion.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vet_core::{JobRequest, JobStatus};
use vet_engine::test_support::ScriptedEngine;
use vet_engine::ManagerConfig;

#[tokio::test]
async fn one_runs_while_the_other_waits() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({})).gated(Arc::clone(&gate));
    let config = ManagerConfig {
        max_concurrent_jobs: 1,
        ..ManagerConfig::default()
    };
    let world = world(engine, config);

    let first = world.manager.submit_job(JobRequest::default()).unwrap();
    let second = world.manager.submit_job(JobRequest::default()).unwrap();

    wait_status(&world, &first, JobStatus::Running).await;
    let counts = world.manager.stats();
    assert_eq!(counts.running, 1);
    assert_eq!(counts.queued, 1);
    assert_eq!(
        world.manager.get_job(&second).unwrap().status,
        JobStatus::Queued
    );

    // Releasing the first lets the second take the slot.
    gate.add_permits(1);
    wait_status(&world, &first, JobStatus::Completed).await;
    wait_status(&world, &second, JobStatus::Running).await;
    assert_eq!(world.manager.stats().running, 1);

    gate.add_permits(1);
    wait_status(&world, &second, JobStatus::Completed).await;
}

#[tokio::test]
async fn cancelled_queued_job_never_runs() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({})).gated(Arc::clone(&gate));
    let config = ManagerConfig {
        max_concurrent_jobs: 1,
        ..ManagerConfig::default()
    };
    let world = world(engine, config);

    let first = world.manager.submit_job(JobRequest::default()).unwrap();
    let second = world.manager.submit_job(JobRequest::default()).unwrap();
    wait_status(&world, &first, JobStatus::Running).await;

    assert!(world.manager.cancel_job(&second));
    let cancelled = world.manager.get_job(&second).unwrap();
    assert_eq!(cancelled.status, JobStatus::Failed);
    assert_eq!(cancelled.error.unwrap().code, "JOB_CANCELLED");
    assert!(cancelled.started_at.is_none());

    gate.add_permits(1);
    wait_status(&world, &first, JobStatus::Completed).await;
    // The dispatcher never picked up the cancelled job.
    assert!(world.manager.get_job(&second).unwrap().started_at.is_none());
}
