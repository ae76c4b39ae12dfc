//! Spawns and supervises a fixed-size pool of [`Worker`]s.
//!
//! Grounded on `WorkerManager` in the reference implementation, which
//! forks `worker_count` worker processes; here each worker is a task
//! sharing one [`LocalBus`] and one set of provider/client collaborators.

use std::sync::Arc;

use aiperf_bus::LocalBus;
use aiperf_core::providers::{ConversationProvider, InferenceClient, ResponseExtractor};

use crate::health::spawn_heartbeat;
use crate::worker::Worker;

pub struct WorkerPool {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers, each with its own id
    /// (`worker_0`, `worker_1`, ...), sharing the given bus and
    /// collaborators.
    pub fn spawn(
        worker_count: usize,
        bus: LocalBus,
        conversations: Arc<dyn ConversationProvider>,
        inference_client: Arc<dyn InferenceClient>,
        extractor: Arc<dyn ResponseExtractor>,
        model: String,
        streaming: bool,
        heartbeat_interval: std::time::Duration,
    ) -> Self {
        let mut handles = Vec::with_capacity(worker_count * 2);
        for index in 0..worker_count {
            let id = format!("worker_{index}");
            let worker = Worker {
                id: id.clone(),
                bus: bus.clone(),
                conversations: conversations.clone(),
                inference_client: inference_client.clone(),
                extractor: extractor.clone(),
                model: model.clone(),
                streaming,
            };
            handles.push(tokio::spawn(async move { worker.run().await }));
            handles.push(spawn_heartbeat(bus.clone(), id, heartbeat_interval));
        }
        Self { handles }
    }

    /// Waits for every worker task to finish (the credit queue closing is
    /// what ends each worker's loop).
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    pub fn abort_all(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
