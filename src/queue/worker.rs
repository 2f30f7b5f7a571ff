use anyhow::Result;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::job::Job;

/// Result of an enqueue attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueue {
    Accepted { job_id: String },
    /// A job with the same idempotency key is already queued or running.
    Duplicate,
}

struct QueuedJob {
    id: String,
    job: Job,
}

/// Handle for dispatching jobs to the worker. Cheap to clone; enqueue never
/// blocks the caller.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<QueuedJob>,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl JobQueue {
    /// Create the queue and its worker receiver half.
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        let pending = Arc::new(Mutex::new(HashSet::new()));
        (
            Self {
                tx,
                pending: Arc::clone(&pending),
            },
            JobReceiver { rx, pending },
        )
    }

    /// Enqueue a job, rejecting duplicates by idempotency key. The key stays
    /// reserved until the worker finishes the job, so a session finalized
    /// twice (or a repeated "done" webhook) produces exactly one run.
    pub fn enqueue(&self, job: Job) -> Result<Enqueue> {
        let key = job.key();

        {
            let mut pending = self.pending.lock().expect("pending set poisoned");
            if !pending.insert(key.clone()) {
                warn!("Duplicate job rejected for key {}", key);
                return Ok(Enqueue::Duplicate);
            }
        }

        let id = format!("job-{}", uuid::Uuid::new_v4());
        let queued = QueuedJob {
            id: id.clone(),
            job,
        };

        if let Err(e) = self.tx.try_send(queued) {
            let mut pending = self.pending.lock().expect("pending set poisoned");
            pending.remove(&key);
            anyhow::bail!("Failed to enqueue job for key {}: {}", key, e);
        }

        info!("Enqueued {} (key {})", id, key);

        Ok(Enqueue::Accepted { job_id: id })
    }
}

pub struct JobReceiver {
    rx: mpsc::Receiver<QueuedJob>,
    pending: Arc<Mutex<HashSet<String>>>,
}

/// Executes one job to completion. Implemented by the pipeline.
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: Job) -> Result<()>;
}

/// The single-concurrency worker loop. Jobs run strictly one at a time:
/// audio tooling and external API usage stay bounded, at the cost of
/// head-of-line blocking. The loop ends when every `JobQueue` handle is
/// dropped.
pub struct Worker {
    receiver: JobReceiver,
    runner: Arc<dyn JobRunner>,
}

impl Worker {
    pub fn new(receiver: JobReceiver, runner: Arc<dyn JobRunner>) -> Self {
        Self { receiver, runner }
    }

    pub async fn run(mut self) {
        info!("Job worker started (concurrency = 1)");

        while let Some(queued) = self.receiver.rx.recv().await {
            let key = queued.job.key();
            info!("Starting {}: {}", queued.id, queued.job.describe());

            // Stage errors are fatal to the job only: log and move on. There
            // is no job-level retry and no dead-letter queue.
            if let Err(e) = self.runner.run(queued.job).await {
                error!("{} failed: {:#}", queued.id, e);
            } else {
                info!("Finished {}", queued.id);
            }

            let mut pending = self.receiver.pending.lock().expect("pending set poisoned");
            pending.remove(&key);
        }

        info!("Job worker stopped");
    }
}
