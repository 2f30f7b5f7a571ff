//! Durable artifact storage
//!
//! Everything the pipeline persists (audio chunks, raw transcripts, summary
//! JSON) goes through the `ArtifactStore` trait, keyed by `/`-separated
//! object keys (see `keys`).

mod store;

pub use store::{ArtifactStore, FsArtifactStore};
