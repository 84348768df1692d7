//! Application state shared across handlers

use lattice_authz::apply::ApplyCoordinator;
use lattice_authz::evaluator::Evaluator;
use lattice_authz::metrics::MetricsCollector;
use lattice_authz::policy::PolicyStore;
use lattice_authz::requests::{AccessRequestStore, InMemoryAccessRequestStore};
use std::sync::Arc;
use std::time::Instant;

/// Shared handles to the engine. The store is the single explicit,
/// revisioned object every component reads through; its lifecycle spans
/// process start to shutdown and every commit produces a fresh snapshot
/// rather than mutating in place.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PolicyStore>,
    pub evaluator: Evaluator,
    pub coordinator: Arc<ApplyCoordinator>,
    pub requests: Arc<dyn AccessRequestStore>,
    pub metrics: Arc<MetricsCollector>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        let evaluator = Evaluator::new(store.clone());
        let coordinator = Arc::new(ApplyCoordinator::new(store.clone(), evaluator.clone()));

        Self {
            store,
            evaluator,
            coordinator,
            requests: Arc::new(InMemoryAccessRequestStore::new()),
            metrics: Arc::new(MetricsCollector::new()),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
