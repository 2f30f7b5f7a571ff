use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::keys::{parse_chunk_key, SessionKey};
use crate::meeting::MeetingMeta;
use crate::queue::{Enqueue, Job, JobQueue};
use crate::storage::ArtifactStore;

/// Write-through buffer for inbound audio chunks.
///
/// Nothing is accumulated in memory: each accepted chunk is persisted
/// immediately under its session/index key, so a crash between chunks loses
/// at most one chunk. A re-sent index overwrites the stored object.
pub struct ChunkBuffer {
    store: Arc<dyn ArtifactStore>,
    /// Duration ceiling expressed as a chunk-index bound.
    max_chunk_index: u32,
}

impl ChunkBuffer {
    pub fn new(store: Arc<dyn ArtifactStore>, max_chunk_index: u32) -> Self {
        Self {
            store,
            max_chunk_index,
        }
    }

    /// Accept one chunk. Malformed keys, empty payloads, and indices at or
    /// above the ceiling are logged and dropped without surfacing an error
    /// to the sender.
    pub async fn submit_chunk(&self, raw_key: &str, bytes: &[u8]) {
        let (session, index, ext) = match parse_chunk_key(raw_key) {
            Some(parsed) => parsed,
            None => {
                warn!("Dropping chunk with malformed key: {}", raw_key);
                return;
            }
        };

        if index >= self.max_chunk_index {
            warn!(
                "Dropping chunk {} for session {}: index at or above duration ceiling {}",
                index, session, self.max_chunk_index
            );
            return;
        }

        if bytes.is_empty() {
            warn!("Dropping empty chunk {} for session {}", index, session);
            return;
        }

        let key = session.chunk_key(index, &ext);
        match self.store.put(&key, bytes).await {
            Ok(()) => {
                debug!("Persisted chunk {} ({} bytes)", key, bytes.len());
            }
            Err(e) => {
                warn!("Failed to persist chunk {}: {:#}", key, e);
            }
        }
    }
}

/// Signal that no more chunks will arrive for a session and processing should
/// begin. Enqueues exactly one job and returns immediately; a session already
/// queued or running comes back as `Duplicate`.
pub fn finalize(queue: &JobQueue, session: SessionKey, meta: MeetingMeta) -> Result<Enqueue> {
    info!(
        "Finalizing session {} ({} attendees, duration {})",
        session,
        meta.attendees.len(),
        meta.duration
    );

    queue.enqueue(Job::ProcessChunks { session, meta })
}
