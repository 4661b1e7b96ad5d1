//! Shared setup for the spec suite.

use std::sync::Arc;
use vet_core::{FakeClock, JobStatus, SequentialIdGen};
use vet_engine::test_support::{wait_until, ScriptedEngine};
use vet_engine::{JobManager, ManagerConfig};
use vet_storage::MemoryStore;

// Glob-importing the prelude puts the store traits in scope for record
// assertions.
pub use vet_storage::{EvaluationStore, RemediationStore};
pub use vet_core::Clock;

pub type SpecManager = JobManager<FakeClock, SequentialIdGen>;

pub struct World {
    pub manager: Arc<SpecManager>,
    pub clock: FakeClock,
    pub persistence: Arc<MemoryStore>,
}

pub fn world(engine: ScriptedEngine, config: ManagerConfig) -> World {
    let clock = FakeClock::new();
    let persistence = Arc::new(MemoryStore::new());
    let manager = JobManager::new(
        Arc::new(engine),
        Arc::clone(&persistence) as Arc<dyn EvaluationStore>,
        Some(Arc::clone(&persistence) as Arc<dyn RemediationStore>),
        config,
        clock.clone(),
        SequentialIdGen::new("job"),
    );
    World {
        manager,
        clock,
        persistence,
    }
}

pub async fn wait_status(world: &World, id: &str, status: JobStatus) {
    let manager = Arc::clone(&world.manager);
    let id = id.to_string();
    wait_until(&format!("{id} to reach {status}"), move || {
        manager.get_job(&id).is_some_and(|j| j.status == status)
    })
    .await;
}
