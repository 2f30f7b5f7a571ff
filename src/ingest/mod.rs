//! Chunk ingestion boundary
//!
//! Accepts ordered binary audio fragments keyed by capture session and writes
//! each one straight through to durable storage. Errors here are swallowed
//! and logged: the sending side gets no failure signal over this channel, a
//! missing summary email is the eventual symptom.

mod buffer;

pub use buffer::{finalize, ChunkBuffer};
