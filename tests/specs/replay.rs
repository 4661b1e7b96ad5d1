//! Late-subscriber replay: no event is lost between submission and the
//! first subscription.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vet_core::{JobRequest, JobStatus, ProgressEvent};
use vet_engine::test_support::{collector, event_names, wait_until, ScriptedEngine};
use vet_engine::ManagerConfig;

fn progress(index: u32) -> ProgressEvent {
    ProgressEvent::EvaluatorProgress {
        evaluator_name: format!("eval-{index}"),
        evaluator_index: index,
        total_evaluators: 3,
        current_file: None,
    }
}

#[tokio::test]
async fn first_subscriber_replays_all_buffered_events_in_order() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({}))
        .with_events(vec![progress(0), progress(1), progress(2)])
        .gated_after_events(Arc::clone(&gate));
    let world = world(engine, ManagerConfig::default());

    let id = world.manager.submit_job(JobRequest::default()).unwrap();
    {
        let manager = Arc::clone(&world.manager);
        let id = id.clone();
        wait_until("all three events to be emitted", move || {
            manager
                .get_job(&id)
                .is_some_and(|j| j.progress.completed_evaluators == 2)
        })
        .await;
    }

    let (subscriber, seen) = collector();
    world.manager.on_progress(&id, subscriber);

    // Replay is synchronous at subscription: queued + status + the three
    // engine events, in the original emit order.
    let replayed = seen.lock().clone();
    assert_eq!(
        event_names(&replayed),
        vec![
            "job.queued",
            "job.status",
            "evaluator.progress",
            "evaluator.progress",
            "evaluator.progress",
        ]
    );
    assert_eq!(replayed[2], progress(0));
    assert_eq!(replayed[3], progress(1));
    assert_eq!(replayed[4], progress(2));

    // Subsequent events arrive live, after the replayed prefix.
    gate.add_permits(1);
    wait_status(&world, &id, JobStatus::Completed).await;
    {
        let seen = Arc::clone(&seen);
        wait_until("terminal event to arrive", move || seen.lock().len() == 6)
            .await;
    }
    assert_eq!(seen.lock()[5].name(), "job.completed");
}

#[tokio::test]
async fn events_after_first_subscriber_are_not_buffered() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({}))
        .with_events(vec![progress(0)])
        .gated(Arc::clone(&gate));
    let world = world(engine, ManagerConfig::default());

    let id = world.manager.submit_job(JobRequest::default()).unwrap();
    let (subscriber, seen) = collector();
    world.manager.on_progress(&id, subscriber);

    gate.add_permits(1);
    wait_status(&world, &id, JobStatus::Completed).await;
    {
        let seen = Arc::clone(&seen);
        wait_until("live events to arrive", move || seen.lock().len() >= 4).await;
    }

    // queued + status replayed, then the engine event and terminal live.
    let names = event_names(&seen.lock());
    assert_eq!(
        names,
        vec![
            "job.queued",
            "job.status",
            "evaluator.progress",
            "job.completed",
        ]
    );
}
