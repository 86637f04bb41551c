//! Concert detection pipeline.
//!
//! Matches a video's recording position and time against known concerts
//! and links the row to the best candidate. The matching itself lives
//! behind [`ConcertMatcher`]; this pipeline only owns the claim/terminal
//! protocol around it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use encore_core::models::{Pipeline, PipelineStatus, Video};
use encore_core::AppError;
use encore_db::VideoStore;

use crate::job_queue::PipelineRunner;

/// A concert candidate for a recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcertMatch {
    pub concert_id: i64,
    pub confidence: f64,
}

/// Finds the concert a video was most likely recorded at. Thresholding is
/// the matcher's job: a returned match is one worth linking.
#[async_trait]
pub trait ConcertMatcher: Send + Sync {
    async fn best_match(
        &self,
        latitude: f64,
        longitude: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<Option<ConcertMatch>, AppError>;
}

/// Matcher used until the concert database side lands: never matches.
pub struct NullMatcher;

#[async_trait]
impl ConcertMatcher for NullMatcher {
    async fn best_match(
        &self,
        _latitude: f64,
        _longitude: f64,
        _recorded_at: DateTime<Utc>,
    ) -> Result<Option<ConcertMatch>, AppError> {
        tracing::debug!("concert matching not wired in, returning no match");
        Ok(None)
    }
}

/// Detection over claimed rows: read the row's metadata, ask the matcher,
/// link on a hit. "No match" is a completed detection, not a failure; only
/// matcher/database errors fail the pipeline.
pub struct DetectionService {
    store: Arc<dyn VideoStore>,
    matcher: Arc<dyn ConcertMatcher>,
}

impl DetectionService {
    pub fn new(store: Arc<dyn VideoStore>, matcher: Arc<dyn ConcertMatcher>) -> Self {
        Self { store, matcher }
    }

    #[tracing::instrument(skip(self, video), fields(video_id = video.id))]
    async fn detect(&self, video: &Video) -> Result<(), AppError> {
        let (Some(latitude), Some(longitude), Some(recorded_at)) =
            (video.latitude, video.longitude, video.recorded_at)
        else {
            // nothing to match against; the row simply stays unlinked
            tracing::debug!(video_id = video.id, "No location/time metadata, skipping match");
            return self
                .store
                .set_pipeline_terminal(Pipeline::Detection, video.id, PipelineStatus::Completed)
                .await;
        };

        match self
            .matcher
            .best_match(latitude, longitude, recorded_at)
            .await?
        {
            Some(found) => {
                tracing::info!(
                    video_id = video.id,
                    concert_id = found.concert_id,
                    confidence = found.confidence,
                    "Concert matched"
                );
                self.store.set_video_concert(video.id, found.concert_id).await?;
            }
            None => {
                tracing::info!(video_id = video.id, "No concert matched");
            }
        }

        self.store
            .set_pipeline_terminal(Pipeline::Detection, video.id, PipelineStatus::Completed)
            .await
    }
}

#[async_trait]
impl PipelineRunner for DetectionService {
    fn pipeline(&self) -> Pipeline {
        Pipeline::Detection
    }

    async fn run(&self, _cancel: CancellationToken, video: Video) -> Result<(), AppError> {
        self.detect(&video).await
    }
}
