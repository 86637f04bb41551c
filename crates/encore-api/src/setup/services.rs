//! Service construction and background pipeline startup.

use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use encore_core::Config;
use encore_db::{VideoRepository, VideoStore};
use encore_media::{FfmpegProbe, MediaProbe};
use encore_pipelines::{
    ConcertMatcher, DetectionService, NullMatcher, PipelineQueue, PipelineRunner, ThumbnailService,
};
use encore_storage::{ObjectStorage, S3Storage};

use crate::services::upload::UploadService;
use crate::state::AppState;

pub async fn build_services(
    config: Config,
    pool: PgPool,
    cancel: CancellationToken,
) -> Result<AppState, anyhow::Error> {
    let videos: Arc<dyn VideoStore> = Arc::new(VideoRepository::new(pool));

    let storage: Arc<dyn ObjectStorage> = Arc::new(
        S3Storage::new(
            config.storage.bucket.clone(),
            config.storage.region.clone(),
            config.storage.endpoint.clone(),
            config.storage.cdn_url.clone(),
        )
        .await?,
    );

    let probe: Arc<dyn MediaProbe> = Arc::new(
        FfmpegProbe::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone()).await?,
    );

    let thumbnails = Arc::new(ThumbnailService::new(
        videos.clone(),
        storage.clone(),
        probe,
        config.thumbnail_max_concurrent,
        cancel.clone(),
    ));

    // Crash recovery for the fire-and-forget path: re-dispatch anything a
    // previous process left queued or mid-flight.
    thumbnails.recover_pending().await;

    // Scheduler-driven path for the same pipeline.
    let runner: Arc<dyn PipelineRunner> = thumbnails.clone();
    let thumbnail_queue = PipelineQueue::new(videos.clone(), runner, &config.jobs);
    thumbnail_queue.start(cancel.clone());

    // Concert detection rides the same substrate with its own pool and
    // scheduler. The matcher backend is pluggable; see NullMatcher.
    let matcher: Arc<dyn ConcertMatcher> = Arc::new(NullMatcher);
    let detection: Arc<dyn PipelineRunner> =
        Arc::new(DetectionService::new(videos.clone(), matcher));
    let detection_queue = PipelineQueue::new(videos.clone(), detection, &config.jobs);
    detection_queue.start(cancel);

    let uploads = UploadService::new(videos.clone(), storage.clone(), Some(thumbnails.clone()));

    Ok(AppState {
        config,
        videos,
        storage,
        uploads,
        thumbnails,
    })
}
