//! Multi-subscriber fan-out: identical sequences, no duplication.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vet_core::{JobRequest, JobStatus, ProgressEvent};
use vet_engine::test_support::{collector, event_names, wait_until, ScriptedEngine};
use vet_engine::ManagerConfig;

#[tokio::test]
async fn every_subscriber_sees_the_same_five_events() {
    let gate = Arc::new(Semaphore::new(0));
    let events: Vec<ProgressEvent> = (0..5)
        .map(|i| ProgressEvent::EvaluatorProgress {
            evaluator_name: format!("eval-{i}"),
            evaluator_index: i,
            total_evaluators: 5,
            current_file: None,
        })
        .collect();
    let engine = ScriptedEngine::ok(json!({}))
        .with_events(events.clone())
        .gated(Arc::clone(&gate));
    let world = world(engine, ManagerConfig::default());

    let id = world.manager.submit_job(JobRequest::default()).unwrap();
    let (first, first_seen) = collector();
    world.manager.on_progress(&id, first);
    let (second, second_seen) = collector();
    world.manager.on_progress(&id, second);

    gate.add_permits(1);
    wait_status(&world, &id, JobStatus::Completed).await;
    {
        let second_seen = Arc::clone(&second_seen);
        wait_until("both subscribers to drain", move || {
            second_seen.lock().len() == 6
        })
        .await;
    }

    // Live traffic: five engine events plus the terminal envelope, each
    // delivered exactly once per subscriber.
    let live = second_seen.lock().clone();
    assert_eq!(live.len(), 6);
    assert_eq!(&live[..5], events.as_slice());
    assert_eq!(live[5].name(), "job.completed");

    // The first subscriber additionally replayed the buffered prefix and
    // then saw the identical live sequence.
    let first_events = first_seen.lock().clone();
    assert_eq!(
        event_names(&first_events)[..2],
        ["job.queued", "job.status"]
    );
    assert_eq!(&first_events[2..], live.as_slice());
}

#[tokio::test]
async fn unsubscribed_callback_stops_receiving() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({}))
        .with_events(vec![ProgressEvent::FileStarted {
            file_path: "a.rs".into(),
        }])
        .gated(Arc::clone(&gate));
    let world = world(engine, ManagerConfig::default());

    let id = world.manager.submit_job(JobRequest::default()).unwrap();
    let (kept, kept_seen) = collector();
    world.manager.on_progress(&id, kept);
    let (dropped, dropped_seen) = collector();
    let sub = world.manager.on_progress(&id, dropped);
    assert!(world.manager.off_progress(&id, sub));

    gate.add_permits(1);
    wait_status(&world, &id, JobStatus::Completed).await;
    {
        let kept_seen = Arc::clone(&kept_seen);
        wait_until("kept subscriber to drain", move || {
            kept_seen.lock().len() == 4
        })
        .await;
    }
    assert!(dropped_seen.lock().is_empty());
}
