//! The meeting processing pipeline
//!
//! Runs on the single-concurrency worker: download, transcribe, assemble,
//! summarize, render, deliver, archive, clean up. Two entry points feed it:
//! finalized chunk sessions and retrieved bot videos.

mod assemble;
mod run;
mod workspace;

pub use assemble::assemble_transcript;
pub use run::{Pipeline, PipelineDeps, PipelineSettings};
pub use workspace::Workspace;
