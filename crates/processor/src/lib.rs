//! Killmail processing pipeline: policy tracking, hydration and matching.

pub mod error;
pub mod hydrate;
pub mod pipeline;
pub mod tracker;

pub use error::ProcessorError;
pub use hydrate::hydrate;
pub use pipeline::{MessageHandler, Processor, ProcessorSettings, Step};
pub use tracker::{Clock, PolicyTracker, Snapshot, TrackedPolicy, SNAPSHOT_TTL_SECS};
