//! Postgres repository for video rows.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;

use encore_core::models::{NewVideo, Pipeline, PipelineStatus, Video, VideoMetadata};
use encore_core::AppError;

use crate::store::VideoStore;

const VIDEO_COLS: &str = r#"
    id,
    user_id,
    filename,
    object_key,
    public_url,
    thumbnail_url,
    status,
    thumbnail_status,
    thumbnail_started_at,
    detection_status,
    detection_started_at,
    duration,
    width,
    height,
    latitude,
    longitude,
    recorded_at,
    event_type,
    event_id,
    created_at,
    updated_at,
    processed_at,
    deleted_at
"#;

const EVENT_TYPE_CONCERT: &str = "concert";

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

/// The canonical claim statement. `SKIP LOCKED` in the inner select is what
/// makes concurrent claimers (and concurrent service instances) disjoint.
fn claim_queued_sql(pipeline: Pipeline) -> String {
    format!(
        r#"
        UPDATE videos
        SET {status} = 'processing', {started_at} = NOW(), updated_at = NOW()
        WHERE id IN (
            SELECT id FROM videos
            WHERE {status} = 'queued' AND deleted_at IS NULL
            ORDER BY created_at, id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {cols}"#,
        status = pipeline.status_column(),
        started_at = pipeline.started_at_column(),
        cols = VIDEO_COLS,
    )
}

fn reset_stuck_sql(pipeline: Pipeline) -> String {
    format!(
        r#"
        UPDATE videos
        SET {status} = 'queued', updated_at = NOW()
        WHERE {status} = 'processing' AND deleted_at IS NULL AND {started_at} < $1"#,
        status = pipeline.status_column(),
        started_at = pipeline.started_at_column(),
    )
}

fn set_terminal_sql(pipeline: Pipeline) -> String {
    format!(
        r#"
        UPDATE videos
        SET {status} = $1, updated_at = NOW()
        WHERE id = $2 AND deleted_at IS NULL"#,
        status = pipeline.status_column(),
    )
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    #[tracing::instrument(skip(self, new), fields(user_id = new.user_id, filename = %new.filename))]
    async fn create_video(&self, new: NewVideo) -> Result<Video, AppError> {
        let sql = format!(
            r#"
            INSERT INTO videos (
                user_id, filename, object_key, public_url, status,
                duration, width, height, latitude, longitude, recorded_at
            )
            VALUES ($1, $2, $3, $4, 'pending_upload', $5, $6, $7, $8, $9, $10)
            RETURNING {}"#,
            VIDEO_COLS
        );

        let video: Video = sqlx::query_as(&sql)
            .bind(new.user_id)
            .bind(&new.filename)
            .bind(&new.object_key)
            .bind(&new.public_url)
            .bind(new.duration)
            .bind(new.width)
            .bind(new.height)
            .bind(new.latitude)
            .bind(new.longitude)
            .bind(new.recorded_at)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(video_id = video.id, "Video row created");
        Ok(video)
    }

    #[tracing::instrument(skip(self))]
    async fn get_video(&self, id: i64) -> Result<Video, AppError> {
        let sql = format!(
            "SELECT {} FROM videos WHERE id = $1 AND deleted_at IS NULL",
            VIDEO_COLS
        );

        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))
    }

    #[tracing::instrument(skip(self))]
    async fn list_videos_by_concert(&self, concert_id: i64) -> Result<Vec<Video>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM videos
            WHERE event_type = $1 AND event_id = $2 AND deleted_at IS NULL
            ORDER BY recorded_at NULLS LAST, created_at, id"#,
            VIDEO_COLS
        );

        let videos = sqlx::query_as(&sql)
            .bind(EVENT_TYPE_CONCERT)
            .bind(concert_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(videos)
    }

    #[tracing::instrument(skip(self))]
    async fn list_videos_by_user(&self, user_id: i64) -> Result<Vec<Video>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM videos
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC"#,
            VIDEO_COLS
        );

        let videos = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(videos)
    }

    #[tracing::instrument(skip(self))]
    async fn set_upload_status_completed(&self, id: i64) -> Result<(), AppError> {
        // Dual write: the chained pipelines become claimable in the same
        // statement that makes the upload visible as completed. Detection
        // only runs for rows that carry something to match on.
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = 'completed',
                thumbnail_status = 'queued',
                detection_status = CASE
                    WHEN latitude IS NOT NULL
                        AND longitude IS NOT NULL
                        AND recorded_at IS NOT NULL
                    THEN 'queued'::pipeline_status
                    ELSE detection_status
                END,
                processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("video {} not found", id)));
        }

        tracing::info!(video_id = id, "Upload completed, thumbnail queued");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_upload_status_failed(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = 'failed', updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("video {} not found", id)));
        }

        tracing::warn!(video_id = id, "Upload marked failed");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(pipeline = %pipeline))]
    async fn claim_queued(&self, pipeline: Pipeline, limit: i64) -> Result<Vec<Video>, AppError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let videos: Vec<Video> = sqlx::query_as(&claim_queued_sql(pipeline))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        if !videos.is_empty() {
            tracing::info!(
                pipeline = %pipeline,
                claimed = videos.len(),
                "Claimed queued videos"
            );
        }
        Ok(videos)
    }

    #[tracing::instrument(skip(self), fields(pipeline = %pipeline, status = %status))]
    async fn set_pipeline_terminal(
        &self,
        pipeline: Pipeline,
        id: i64,
        status: PipelineStatus,
    ) -> Result<(), AppError> {
        if !status.is_terminal() {
            return Err(AppError::Internal(format!(
                "set_pipeline_terminal called with non-terminal status {}",
                status
            )));
        }

        let result = sqlx::query(&set_terminal_sql(pipeline))
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("video {} not found", id)));
        }

        tracing::info!(video_id = id, "Pipeline reached terminal state");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(pipeline = %pipeline))]
    async fn reset_stuck(&self, pipeline: Pipeline, older_than: Duration) -> Result<u64, AppError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| AppError::Internal(format!("invalid stuck threshold: {}", e)))?;

        let result = sqlx::query(&reset_stuck_sql(pipeline))
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let reset = result.rows_affected();
        if reset > 0 {
            tracing::warn!(
                pipeline = %pipeline,
                reset = reset,
                "Reset stuck processing videos back to queued"
            );
        }
        Ok(reset)
    }

    #[tracing::instrument(skip(self, metadata))]
    async fn update_video_metadata(
        &self,
        id: i64,
        metadata: &VideoMetadata,
    ) -> Result<(), AppError> {
        // COALESCE keeps existing values: a client-provided field is never
        // overwritten by a server-extracted one. Clearing back to NULL is
        // deliberately impossible here.
        let (latitude, longitude) = match metadata.gps {
            Some(gps) => (Some(gps.latitude), Some(gps.longitude)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            UPDATE videos
            SET duration = COALESCE(duration, $1),
                width = COALESCE(width, $2),
                height = COALESCE(height, $3),
                latitude = COALESCE(latitude, $4),
                longitude = COALESCE(longitude, $5),
                recorded_at = COALESCE(recorded_at, $6),
                updated_at = NOW()
            WHERE id = $7 AND deleted_at IS NULL
            "#,
        )
        .bind(metadata.duration)
        .bind(metadata.width)
        .bind(metadata.height)
        .bind(latitude)
        .bind(longitude)
        .bind(metadata.recorded_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, url))]
    async fn set_thumbnail_url(&self, id: i64, url: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE videos
            SET thumbnail_url = $1, updated_at = NOW()
            WHERE id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_video_concert(&self, id: i64, concert_id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET event_type = $1, event_id = $2, updated_at = NOW()
            WHERE id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(EVENT_TYPE_CONCERT)
        .bind(concert_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("video {} not found", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn soft_delete_video(&self, id: i64, user_id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("video {} not found", id)));
        }

        tracing::info!(video_id = id, "Video soft-deleted");
        Ok(())
    }
}
