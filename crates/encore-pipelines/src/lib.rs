//! Background pipelines for encore.
//!
//! [`PipelineQueue`] is the orchestrator that binds a worker pool and a
//! periodic scheduler to one pipeline's claim protocol.
//! [`ThumbnailService`] is the thumbnail extraction pipeline, the canonical
//! pipeline built on that substrate; [`DetectionService`] links videos to
//! concerts behind the same orchestration.

pub mod detection;
pub mod job_queue;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testutil;

pub use detection::{ConcertMatch, ConcertMatcher, DetectionService, NullMatcher};
pub use job_queue::{PipelineQueue, PipelineRunner};
pub use thumbnail::ThumbnailService;
