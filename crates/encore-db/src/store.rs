//! Persistence contract for video rows.

use async_trait::async_trait;
use std::time::Duration;

use encore_core::models::{NewVideo, Pipeline, PipelineStatus, Video, VideoMetadata};
use encore_core::AppError;

/// Typed persistence of video rows and their atomic state transitions.
///
/// Services take this as a trait object so the coordinator, the pipelines,
/// and tests all share one seam. Every mutation is a single SQL statement;
/// there are no multi-statement invariants for callers to uphold.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Insert a new row with `status = pending_upload` and whatever
    /// client-provided metadata arrived with the init request.
    async fn create_video(&self, new: NewVideo) -> Result<Video, AppError>;

    /// Fetch a row by id. Soft-deleted rows are `NotFound`.
    async fn get_video(&self, id: i64) -> Result<Video, AppError>;

    /// Videos linked to a concert, ordered by recorded_at (nulls last),
    /// then created_at, then id.
    async fn list_videos_by_concert(&self, concert_id: i64) -> Result<Vec<Video>, AppError>;

    /// A user's uploads, newest first.
    async fn list_videos_by_user(&self, user_id: i64) -> Result<Vec<Video>, AppError>;

    /// Mark the upload completed and enqueue the chained pipelines in the
    /// same statement, so the queued row is visible to claimers the instant
    /// the upload is visible as completed.
    async fn set_upload_status_completed(&self, id: i64) -> Result<(), AppError>;

    /// Mark the upload failed (abort path).
    async fn set_upload_status_failed(&self, id: i64) -> Result<(), AppError>;

    /// Atomically transition up to `limit` rows of `pipeline` from queued
    /// to processing and return them. Safe to call from any number of
    /// concurrent instances; no row is ever returned twice.
    async fn claim_queued(&self, pipeline: Pipeline, limit: i64) -> Result<Vec<Video>, AppError>;

    /// Write a terminal state for one pipeline. `status` must be
    /// `Completed` or `Failed`.
    async fn set_pipeline_terminal(
        &self,
        pipeline: Pipeline,
        id: i64,
        status: PipelineStatus,
    ) -> Result<(), AppError>;

    /// Reset rows stuck in processing longer than `older_than` back to
    /// queued; returns how many were reset. A zero duration resets
    /// unconditionally (cold-start recovery).
    async fn reset_stuck(&self, pipeline: Pipeline, older_than: Duration) -> Result<u64, AppError>;

    /// COALESCE-merge extracted metadata: only NULL columns are filled, so
    /// client-provided values are never overwritten.
    async fn update_video_metadata(
        &self,
        id: i64,
        metadata: &VideoMetadata,
    ) -> Result<(), AppError>;

    async fn set_thumbnail_url(&self, id: i64, url: &str) -> Result<(), AppError>;

    /// Link a video to a concert.
    async fn set_video_concert(&self, id: i64, concert_id: i64) -> Result<(), AppError>;

    /// Soft-delete a row owned by `user_id`. Deleted rows disappear from
    /// every read and claim.
    async fn soft_delete_video(&self, id: i64, user_id: i64) -> Result<(), AppError>;
}
