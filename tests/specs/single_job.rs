//! Single-job happy path: submit, progress, terminal result, persistence.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use vet_core::{JobRequest, JobStatus, LogLevel, ProgressEvent};
use vet_engine::test_support::{wait_until, ScriptedEngine};
use vet_engine::ManagerConfig;

#[tokio::test]
async fn single_job_happy_path() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({"ok": true}))
        .with_events(vec![
            ProgressEvent::JobStarted {
                mode: "full".into(),
                total_files: 1,
            },
            ProgressEvent::EvaluatorProgress {
                evaluator_name: "correctness".into(),
                evaluator_index: 0,
                total_evaluators: 2,
                current_file: None,
            },
            ProgressEvent::EvaluatorProgress {
                evaluator_name: "security".into(),
                evaluator_index: 1,
                total_evaluators: 2,
                current_file: None,
            },
        ])
        .gated_after_events(Arc::clone(&gate));
    let world = world(engine, ManagerConfig::default());

    let request = json!({"path": "/workspace", "mode": "full"});
    let id = world
        .manager
        .submit_job(JobRequest::new(request.clone()))
        .unwrap();

    // Wait for the engine's events to land, then let 1234ms elapse before
    // it returns so the reported duration is exact.
    {
        let manager = Arc::clone(&world.manager);
        let id = id.clone();
        wait_until("progress to reach the last evaluator", move || {
            manager
                .get_job(&id)
                .is_some_and(|j| j.progress.completed_evaluators == 1)
        })
        .await;
    }
    world.clock.advance(Duration::from_millis(1234));
    gate.add_permits(1);
    wait_status(&world, &id, JobStatus::Completed).await;
    {
        // The completion log lands after the persistence call resolves.
        let manager = Arc::clone(&world.manager);
        let id = id.clone();
        wait_until("completion log entry", move || {
            manager.get_job(&id).is_some_and(|j| j.logs.len() == 4)
        })
        .await;
    }

    let job = world.manager.get_job(&id).unwrap();
    assert_eq!(job.result, Some(json!({"ok": true})));
    assert_eq!(job.duration_ms(), 1234);
    assert_eq!(job.progress.total_evaluators, 2);
    assert_eq!(job.progress.current_evaluator.as_deref(), Some("security"));

    let messages: Vec<&str> = job.logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Started evaluation (full mode, 1 file(s))",
            "Running correctness (1/2)",
            "Running security (2/2)",
            "Evaluation completed in 1s",
        ]
    );
    assert!(job.logs.iter().take(3).all(|l| l.level == LogLevel::Info));
    assert_eq!(job.logs[3].level, LogLevel::Success);

    // Persistence saw exactly one save, with the original request and
    // creation timestamp.
    assert_eq!(world.persistence.evaluation_count(), 1);
    let record = world.persistence.get_evaluation(&id).await.unwrap().unwrap();
    assert_eq!(record.request, request);
    assert_eq!(record.result, Some(json!({"ok": true})));
    assert_eq!(record.created_at, job.created_at);
}

#[tokio::test]
async fn submit_then_lookup_round_trips() {
    let world = world(
        ScriptedEngine::ok(json!({})),
        ManagerConfig::default(),
    );
    let before = world.clock.epoch_ms();
    let id = world
        .manager
        .submit_job(JobRequest::new(json!({"path": "/p"})))
        .unwrap();

    let job = world.manager.get_job(&id).unwrap();
    assert_eq!(job.id, id);
    assert_eq!(job.request.payload, json!({"path": "/p"}));
    assert_eq!(job.created_at, before);
}
