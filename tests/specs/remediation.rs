//! Remediation flow: strict serialism and the evaluation link-back.

use crate::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vet_core::{FakeClock, JobRequest, JobStatus, SequentialIdGen};
use vet_engine::test_support::{wait_until, ScriptedEngine};
use vet_engine::{ManagerConfig, RemediationManager};
use vet_storage::MemoryStore;

type SpecRemediations = RemediationManager<FakeClock, SequentialIdGen>;

fn remediation_world(engine: ScriptedEngine) -> (Arc<SpecRemediations>, Arc<MemoryStore>) {
    let persistence = Arc::new(MemoryStore::new());
    let manager = RemediationManager::new(
        Arc::new(engine),
        Arc::clone(&persistence) as Arc<dyn RemediationStore>,
        ManagerConfig::serial(),
        FakeClock::new(),
        SequentialIdGen::new("rem"),
    );
    (manager, persistence)
}

async fn wait_rem_status(manager: &Arc<SpecRemediations>, id: &str, status: JobStatus) {
    let manager = Arc::clone(manager);
    let id = id.to_string();
    wait_until(&format!("{id} to reach {status}"), move || {
        manager.get_job(&id).is_some_and(|j| j.status == status)
    })
    .await;
}

#[tokio::test]
async fn remediations_never_overlap() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = ScriptedEngine::ok(json!({"patched": 1})).gated(Arc::clone(&gate));
    let (manager, _persistence) = remediation_world(engine);

    let first = manager
        .submit_job(JobRequest::new(json!({"evaluationId": "eval-1"})))
        .unwrap();
    let second = manager
        .submit_job(JobRequest::new(json!({"evaluationId": "eval-2"})))
        .unwrap();

    wait_rem_status(&manager, &first, JobStatus::Running).await;
    assert_eq!(manager.stats().running, 1);
    assert_eq!(
        manager.get_job(&second).unwrap().status,
        JobStatus::Queued
    );
    assert!(manager.has_active_job_for_evaluation("eval-1"));
    assert!(manager.has_active_job_for_evaluation("eval-2"));

    gate.add_permits(1);
    wait_rem_status(&manager, &first, JobStatus::Completed).await;
    wait_rem_status(&manager, &second, JobStatus::Running).await;
    gate.add_permits(1);
    wait_rem_status(&manager, &second, JobStatus::Completed).await;
}

#[tokio::test]
async fn successful_rescore_links_back_to_the_remediation() {
    // The remediation finishes, then a follow-up evaluation carrying
    // _sourceRemediationId links its id into the remediation record.
    let (remediations, persistence) = remediation_world(ScriptedEngine::ok(json!({"patched": 2})));
    let remediation_id = remediations
        .submit_job(JobRequest::new(json!({"evaluationId": "eval-1"})))
        .unwrap();
    wait_rem_status(&remediations, &remediation_id, JobStatus::Completed).await;
    {
        let persistence = Arc::clone(&persistence);
        wait_until("remediation to be persisted", move || {
            persistence.remediation_count() == 1
        })
        .await;
    }

    let eval_world = {
        let clock = FakeClock::new();
        let manager = vet_engine::JobManager::new(
            Arc::new(ScriptedEngine::ok(json!({"score": 9}))),
            Arc::clone(&persistence) as Arc<dyn EvaluationStore>,
            Some(Arc::clone(&persistence) as Arc<dyn RemediationStore>),
            ManagerConfig::default(),
            clock.clone(),
            SequentialIdGen::new("job"),
        );
        World {
            manager,
            clock,
            persistence: Arc::clone(&persistence),
        }
    };

    let eval_id = eval_world
        .manager
        .submit_job(JobRequest::new(
            json!({"_sourceRemediationId": remediation_id.clone()}),
        ))
        .unwrap();
    wait_status(&eval_world, &eval_id, JobStatus::Completed).await;

    // The link lands after the evaluation save resolves.
    let mut record = None;
    for _ in 0..200 {
        record = persistence.get_remediation(&remediation_id).await.unwrap();
        if record
            .as_ref()
            .is_some_and(|r| r.result_evaluation_id.is_some())
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let record = record.unwrap();
    assert_eq!(record.result, Some(json!({"patched": 2})));
    assert_eq!(record.result_evaluation_id, Some(eval_id));
}
