//! In-memory collaborators for exercising the upload coordinator and the
//! HTTP surface without Postgres or an object store.

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use encore_api::services::upload::UploadService;
use encore_api::state::AppState;
use encore_core::config::{ConcurrencyConfig, StorageConfig};
use encore_core::models::{
    NewVideo, Pipeline, PipelineStatus, UploadPart, UploadStatus, Video, VideoMetadata,
};
use encore_core::{AppError, Config};
use encore_db::VideoStore;
use encore_media::{MediaProbe, ProbeError};
use encore_pipelines::ThumbnailService;
use encore_storage::{ObjectStorage, StorageError, StorageResult};

// ---------- video store ----------

#[derive(Default)]
pub struct FakeVideoStore {
    rows: Mutex<BTreeMap<i64, Video>>,
    next_id: AtomicI64,
    pub fail_create: std::sync::atomic::AtomicBool,
}

impl FakeVideoStore {
    pub async fn get(&self, id: i64) -> Video {
        self.rows.lock().await.get(&id).expect("video missing").clone()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn put(&self, video: Video) {
        self.rows.lock().await.insert(video.id, video);
    }
}

fn missing(id: i64) -> AppError {
    AppError::NotFound(format!("video {} not found", id))
}

#[async_trait]
impl VideoStore for FakeVideoStore {
    async fn create_video(&self, new: NewVideo) -> Result<Video, AppError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let video = Video {
            id,
            user_id: new.user_id,
            filename: new.filename,
            object_key: new.object_key,
            public_url: new.public_url,
            thumbnail_url: None,
            status: UploadStatus::PendingUpload,
            thumbnail_status: None,
            thumbnail_started_at: None,
            detection_status: None,
            detection_started_at: None,
            duration: new.duration,
            width: new.width,
            height: new.height,
            latitude: new.latitude,
            longitude: new.longitude,
            recorded_at: new.recorded_at,
            event_type: None,
            event_id: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
            deleted_at: None,
        };
        self.rows.lock().await.insert(id, video.clone());
        Ok(video)
    }

    async fn get_video(&self, id: i64) -> Result<Video, AppError> {
        self.rows
            .lock()
            .await
            .get(&id)
            .filter(|v| v.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| missing(id))
    }

    async fn list_videos_by_concert(&self, concert_id: i64) -> Result<Vec<Video>, AppError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|v| {
                v.deleted_at.is_none()
                    && v.event_type.as_deref() == Some("concert")
                    && v.event_id == Some(concert_id)
            })
            .cloned()
            .collect())
    }

    async fn list_videos_by_user(&self, user_id: i64) -> Result<Vec<Video>, AppError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|v| v.deleted_at.is_none() && v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_upload_status_completed(&self, id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows.get_mut(&id).ok_or_else(|| missing(id))?;
        video.status = UploadStatus::Completed;
        video.thumbnail_status = Some(PipelineStatus::Queued);
        if video.latitude.is_some() && video.longitude.is_some() && video.recorded_at.is_some() {
            video.detection_status = Some(PipelineStatus::Queued);
        }
        video.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn set_upload_status_failed(&self, id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows.get_mut(&id).ok_or_else(|| missing(id))?;
        video.status = UploadStatus::Failed;
        Ok(())
    }

    async fn claim_queued(&self, pipeline: Pipeline, limit: i64) -> Result<Vec<Video>, AppError> {
        let mut rows = self.rows.lock().await;
        let mut claimed = Vec::new();
        for video in rows.values_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            if video.deleted_at.is_none()
                && video.pipeline_status(pipeline) == Some(PipelineStatus::Queued)
            {
                match pipeline {
                    Pipeline::Thumbnail => {
                        video.thumbnail_status = Some(PipelineStatus::Processing);
                        video.thumbnail_started_at = Some(Utc::now());
                    }
                    Pipeline::Detection => {
                        video.detection_status = Some(PipelineStatus::Processing);
                        video.detection_started_at = Some(Utc::now());
                    }
                }
                claimed.push(video.clone());
            }
        }
        Ok(claimed)
    }

    async fn set_pipeline_terminal(
        &self,
        pipeline: Pipeline,
        id: i64,
        status: PipelineStatus,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows.get_mut(&id).ok_or_else(|| missing(id))?;
        match pipeline {
            Pipeline::Thumbnail => video.thumbnail_status = Some(status),
            Pipeline::Detection => video.detection_status = Some(status),
        }
        Ok(())
    }

    async fn reset_stuck(&self, pipeline: Pipeline, _older_than: Duration) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().await;
        let mut reset = 0;
        for video in rows.values_mut() {
            if video.pipeline_status(pipeline) == Some(PipelineStatus::Processing) {
                match pipeline {
                    Pipeline::Thumbnail => video.thumbnail_status = Some(PipelineStatus::Queued),
                    Pipeline::Detection => video.detection_status = Some(PipelineStatus::Queued),
                }
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn update_video_metadata(
        &self,
        id: i64,
        metadata: &VideoMetadata,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows.get_mut(&id).ok_or_else(|| missing(id))?;
        video.duration = video.duration.or(metadata.duration);
        video.width = video.width.or(metadata.width);
        video.height = video.height.or(metadata.height);
        if let Some(gps) = metadata.gps {
            video.latitude = video.latitude.or(Some(gps.latitude));
            video.longitude = video.longitude.or(Some(gps.longitude));
        }
        video.recorded_at = video.recorded_at.or(metadata.recorded_at);
        Ok(())
    }

    async fn set_thumbnail_url(&self, id: i64, url: &str) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows.get_mut(&id).ok_or_else(|| missing(id))?;
        video.thumbnail_url = Some(url.to_string());
        Ok(())
    }

    async fn set_video_concert(&self, id: i64, concert_id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows.get_mut(&id).ok_or_else(|| missing(id))?;
        video.event_type = Some("concert".to_string());
        video.event_id = Some(concert_id);
        Ok(())
    }

    async fn soft_delete_video(&self, id: i64, user_id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none() && v.user_id == user_id)
            .ok_or_else(|| missing(id))?;
        video.deleted_at = Some(Utc::now());
        Ok(())
    }
}

// ---------- object storage ----------

#[derive(Default)]
pub struct FakeObjectStorage {
    pub created: AtomicUsize,
    pub aborted: AtomicUsize,
    pub completed: AtomicUsize,
    pub deleted: AtomicUsize,
    pub fail_presign_parts: std::sync::atomic::AtomicBool,
    pub fail_complete: std::sync::atomic::AtomicBool,
}

impl FakeObjectStorage {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for FakeObjectStorage {
    async fn create_multipart(&self, _key: &str, _content_type: &str) -> StorageResult<String> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("upload-{}", self.created()))
    }

    async fn presign_part_urls(
        &self,
        key: &str,
        _upload_id: &str,
        part_count: usize,
    ) -> StorageResult<Vec<String>> {
        if self.fail_presign_parts.load(Ordering::SeqCst) {
            return Err(StorageError::Presign("simulated failure".to_string()));
        }
        Ok((1..=part_count)
            .map(|n| format!("https://signed.test/{}?partNumber={}", key, n))
            .collect())
    }

    async fn complete_multipart(
        &self,
        _key: &str,
        _upload_id: &str,
        parts: &[UploadPart],
    ) -> StorageResult<()> {
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(StorageError::Multipart("simulated failure".to_string()));
        }
        for pair in parts.windows(2) {
            if pair[1].part_number <= pair[0].part_number {
                return Err(StorageError::InvalidParts("out of order".to_string()));
            }
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, _upload_id: &str) -> StorageResult<()> {
        self.aborted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn presign_get(&self, key: &str, _ttl: Duration) -> StorageResult<String> {
        Ok(format!("https://signed.test/{}", key))
    }

    async fn put_object(
        &self,
        key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        Ok(format!("https://cdn.test/{}", key))
    }

    async fn delete_object(&self, _key: &str) -> StorageResult<()> {
        self.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cdn_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}

// ---------- media probe ----------

#[derive(Default)]
pub struct FakeProbe;

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, _url: &str) -> Result<VideoMetadata, ProbeError> {
        Ok(VideoMetadata {
            duration: Some(120.0),
            width: Some(1920),
            height: Some(1080),
            ..Default::default()
        })
    }

    async fn extract_frame(&self, _url: &str, _offset: f64) -> Result<Vec<u8>, ProbeError> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

// ---------- assembly ----------

pub struct TestHarness {
    pub store: Arc<FakeVideoStore>,
    pub storage: Arc<FakeObjectStorage>,
    pub uploads: UploadService,
}

/// Coordinator wired to fakes. `with_fanout` controls whether confirm also
/// dispatches the in-process thumbnail pipeline.
pub fn harness(with_fanout: bool) -> TestHarness {
    let store = Arc::new(FakeVideoStore::default());
    let storage = Arc::new(FakeObjectStorage::default());

    let thumbnails = with_fanout.then(|| {
        Arc::new(ThumbnailService::new(
            store.clone(),
            storage.clone(),
            Arc::new(FakeProbe),
            4,
            CancellationToken::new(),
        ))
    });

    let uploads = UploadService::new(store.clone(), storage.clone(), thumbnails);

    TestHarness {
        store,
        storage,
        uploads,
    }
}

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        database_url: "postgresql://localhost/encore_test".to_string(),
        db_max_connections: 5,
        db_timeout_seconds: 5,
        storage: StorageConfig {
            bucket: "encore-test".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            cdn_url: "https://cdn.test".to_string(),
        },
        jobs: ConcurrencyConfig {
            concurrency: 2,
            queue_size: 10,
            interval_secs: 30,
            stuck_threshold_mins: 10,
        },
        thumbnail_max_concurrent: 4,
        ffmpeg_path: "ffmpeg".to_string(),
        ffprobe_path: "ffprobe".to_string(),
    }
}

/// Full HTTP app over the fakes.
pub fn test_app(with_fanout: bool) -> (TestHarness, axum::Router) {
    let h = harness(with_fanout);

    let thumbnails = Arc::new(ThumbnailService::new(
        h.store.clone(),
        h.storage.clone(),
        Arc::new(FakeProbe),
        4,
        CancellationToken::new(),
    ));

    let state = AppState {
        config: test_config(),
        videos: h.store.clone(),
        storage: h.storage.clone(),
        uploads: h.uploads.clone(),
        thumbnails,
    };

    let router = encore_api::setup::routes::build_router(state);
    (h, router)
}
