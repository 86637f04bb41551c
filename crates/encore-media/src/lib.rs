//! Media probing for encore.
//!
//! A thin contract over the external ffprobe/ffmpeg binaries: structural
//! metadata extraction and single-frame JPEG extraction, both streaming
//! straight from a URL. No database, no object store, no domain knowledge.

pub mod probe;
pub mod tags;

pub use probe::{FfmpegProbe, MediaProbe, ProbeError};
