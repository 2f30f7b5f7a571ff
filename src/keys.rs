use serde::{Deserialize, Serialize};

/// Composite identity for one capture session.
///
/// A session is scoped to the meeting host, the counterpart (or the meeting
/// type for general meetings), and the meeting date. All durable chunk keys
/// and post-processing artifact names derive from this triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub host_id: String,
    pub counterpart: String,
    pub date: String,
}

impl SessionKey {
    pub fn new(
        host_id: impl Into<String>,
        counterpart: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            counterpart: counterpart.into(),
            date: date.into(),
        }
    }

    /// Storage prefix all chunk objects for this session live under.
    pub fn prefix(&self) -> String {
        format!("{}/{}/{}/", self.host_id, self.counterpart, self.date)
    }

    /// Storage key for a single chunk.
    pub fn chunk_key(&self, index: u32, ext: &str) -> String {
        format!("{}{}.{}", self.prefix(), index, ext)
    }

    /// Base name shared by the transcript and summary artifacts.
    pub fn artifact_stem(&self) -> String {
        format!("{}_{}_{}", self.host_id, self.counterpart, self.date)
    }

    pub fn transcript_artifact(&self) -> String {
        format!("Transcription_{}.txt", self.artifact_stem())
    }

    pub fn summary_artifact(&self) -> String {
        format!("Summary_{}.json", self.artifact_stem())
    }

    /// Idempotency key used by the job queue to reject duplicate finalize
    /// triggers for the same session.
    pub fn job_key(&self) -> String {
        format!("{}/{}/{}", self.host_id, self.counterpart, self.date)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.host_id, self.counterpart, self.date)
    }
}

/// Parse an inbound chunk key of the form
/// `{host}/{counterpart}/{date}/..._{index}.{ext}` (the index may also be the
/// whole file stem, e.g. `12.webm`).
///
/// Returns the session, the chunk index, and the file extension. `None` means
/// the key is malformed and the chunk should be dropped at the boundary.
pub fn parse_chunk_key(raw: &str) -> Option<(SessionKey, u32, String)> {
    let mut parts = raw.split('/');
    let host = parts.next()?;
    let counterpart = parts.next()?;
    let date = parts.next()?;
    let file = parts.next()?;
    if parts.next().is_some() || host.is_empty() || counterpart.is_empty() || date.is_empty() {
        return None;
    }

    let (stem, ext) = file.rsplit_once('.')?;
    // The numeric index is whatever follows the last underscore in the stem.
    let index_str = stem.rsplit('_').next()?;
    let index: u32 = index_str.parse().ok()?;

    Some((
        SessionKey::new(host, counterpart, date),
        index,
        ext.to_string(),
    ))
}

/// Extract the numeric chunk index from a stored chunk key or a local chunk
/// filename. Used to restore recording order regardless of arrival order.
pub fn chunk_index_of(key: &str) -> Option<u32> {
    let file = key.rsplit('/').next()?;
    let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
    let index_str = stem.rsplit('_').next()?;
    index_str.parse().ok()
}
