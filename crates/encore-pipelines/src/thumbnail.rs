//! Thumbnail extraction pipeline.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use encore_core::models::{Pipeline, PipelineStatus, Video};
use encore_core::AppError;
use encore_db::VideoStore;
use encore_media::MediaProbe;
use encore_storage::{keys, ObjectStorage};

/// Extract the frame at 10% into the video.
const OFFSET_FRACTION: f64 = 0.10;
/// Offset when the duration is unknown even after probing.
const OFFSET_FALLBACK_SECS: f64 = 5.0;
/// Presigned URL TTL. Must outlive worst-case ffprobe + ffmpeg time.
const PRESIGN_GET_TTL: Duration = Duration::from_secs(15 * 60);
/// Cap on videos re-dispatched by the construction-time recovery sweep.
const RECOVERY_BATCH_SIZE: i64 = 1000;

/// Thumbnail extraction: presign a GET, probe missing metadata, pull one
/// frame, upload it, record the URL.
///
/// Only the presign (entry) and the terminal write (exit) are hard steps.
/// Everything in between is enrichment: its failures are logged and the
/// pipeline still reports `completed`, because a video without a thumbnail
/// is degraded, not broken.
#[derive(Clone)]
pub struct ThumbnailService {
    store: Arc<dyn VideoStore>,
    storage: Arc<dyn ObjectStorage>,
    probe: Arc<dyn MediaProbe>,
    semaphore: Arc<Semaphore>,
    /// Process-scoped token. Fan-out tasks inherit this so they outlive the
    /// HTTP request that triggered them.
    cancel: CancellationToken,
}

impl ThumbnailService {
    pub fn new(
        store: Arc<dyn VideoStore>,
        storage: Arc<dyn ObjectStorage>,
        probe: Arc<dyn MediaProbe>,
        max_concurrent: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            storage,
            probe,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            cancel,
        }
    }

    /// Run the pipeline synchronously for a single claimed video.
    #[tracing::instrument(skip(self, cancel, video), fields(video_id = video.id))]
    pub async fn extract(
        &self,
        cancel: CancellationToken,
        video: &Video,
    ) -> Result<(), AppError> {
        // step 1: presign GET; ffprobe and ffmpeg stream from this
        // directly, nothing is downloaded to disk
        let url = self
            .storage
            .presign_get(&video.object_key, PRESIGN_GET_TTL)
            .await
            .map_err(AppError::from)?;

        // step 2: only probe when the client left gaps
        let mut duration = video.duration;
        if !video.has_core_metadata() {
            match self.probe.probe(&url).await {
                Err(e) => {
                    tracing::warn!(video_id = video.id, error = %e, "ffprobe failed");
                }
                Ok(metadata) => {
                    // step 3: fill DB gaps; the COALESCE merge preserves
                    // client-provided values
                    if let Err(e) = self.store.update_video_metadata(video.id, &metadata).await {
                        tracing::warn!(video_id = video.id, error = %e, "metadata update failed");
                    }
                    if duration.is_none() {
                        duration = metadata.duration;
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            // the row stays in processing; stuck recovery re-queues it
            return Err(AppError::Internal("cancelled".to_string()));
        }

        // step 4: offset into the video
        let offset = duration.map_or(OFFSET_FALLBACK_SECS, |d| d * OFFSET_FRACTION);

        // step 5: extract a frame; steps 5-6 are soft, the video stays
        // watchable without a thumbnail
        match self.probe.extract_frame(&url, offset).await {
            Err(e) => {
                tracing::warn!(video_id = video.id, error = %e, "frame extraction failed");
            }
            Ok(frame) => {
                let key = keys::thumbnail_object_key(video.id);
                match self
                    .storage
                    .put_object(&key, Bytes::from(frame), "image/jpeg")
                    .await
                {
                    Err(e) => {
                        tracing::warn!(video_id = video.id, error = %e, "thumbnail upload failed");
                    }
                    Ok(thumbnail_url) => {
                        // step 6: record the artifact URL
                        if let Err(e) =
                            self.store.set_thumbnail_url(video.id, &thumbnail_url).await
                        {
                            tracing::warn!(
                                video_id = video.id,
                                error = %e,
                                "failed to record thumbnail URL"
                            );
                        }
                    }
                }
            }
        }

        // step 7: terminal state regardless of the enrichment outcome
        self.store
            .set_pipeline_terminal(Pipeline::Thumbnail, video.id, PipelineStatus::Completed)
            .await
    }

    /// Fire-and-forget extraction, bounded by the fan-out semaphore.
    ///
    /// Used by the upload coordinator to cut first-hit latency; the queued
    /// row in the database carries the crash guarantee, so losing this task
    /// loses nothing.
    pub fn extract_async(&self, video: Video) {
        let service = self.clone();
        tokio::spawn(async move {
            let permit = match service.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed: shutting down
            };
            let _permit = permit;

            let video_id = video.id;
            if let Err(e) = service.extract(service.cancel.clone(), &video).await {
                tracing::error!(video_id, error = %e, "async thumbnail extraction failed");
                if let Err(e) = service
                    .store
                    .set_pipeline_terminal(Pipeline::Thumbnail, video_id, PipelineStatus::Failed)
                    .await
                {
                    tracing::error!(video_id, error = %e, "failed to mark thumbnail failed");
                }
            }
        });
    }

    /// Resume extractions interrupted by a previous crash or restart: reset
    /// everything stuck in processing (any age), claim the queued backlog,
    /// and re-dispatch through the fan-out path.
    pub async fn recover_pending(&self) {
        if let Err(e) = self
            .store
            .reset_stuck(Pipeline::Thumbnail, Duration::ZERO)
            .await
        {
            tracing::error!(error = %e, "thumbnail recovery: reset failed");
            return;
        }

        let videos = match self
            .store
            .claim_queued(Pipeline::Thumbnail, RECOVERY_BATCH_SIZE)
            .await
        {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!(error = %e, "thumbnail recovery: claim failed");
                return;
            }
        };

        if videos.is_empty() {
            return;
        }

        tracing::info!(count = videos.len(), "Re-dispatching interrupted thumbnail jobs");
        for video in videos {
            self.extract_async(video);
        }
    }
}

#[async_trait::async_trait]
impl crate::job_queue::PipelineRunner for ThumbnailService {
    fn pipeline(&self) -> Pipeline {
        Pipeline::Thumbnail
    }

    async fn run(&self, cancel: CancellationToken, video: Video) -> Result<(), AppError> {
        self.extract(cancel, &video).await
    }
}
