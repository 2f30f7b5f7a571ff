//! Background job orchestration
//!
//! A single-concurrency worker drains a channel of processing jobs, one
//! finalized meeting per job. Enqueue is fire-and-forget; the queue itself
//! enforces an idempotency key so the same session (or bot) cannot be
//! processed twice concurrently.

mod job;
mod worker;

pub use job::Job;
pub use worker::{Enqueue, JobQueue, JobReceiver, JobRunner, Worker};
