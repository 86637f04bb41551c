//! Hand-rolled in-memory fakes for the trait seams, shared by this crate's
//! tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use encore_core::models::{
    GpsCoordinates, NewVideo, Pipeline, PipelineStatus, UploadStatus, Video, VideoMetadata,
};
use encore_core::AppError;
use encore_db::VideoStore;
use encore_media::{MediaProbe, ProbeError};
use encore_storage::{ObjectStorage, StorageError, StorageResult};

fn base_video(id: i64, user_id: i64) -> Video {
    Video {
        id,
        user_id,
        filename: format!("clip-{}.mp4", id),
        object_key: format!("videos/{}/{}_clip-{}.mp4", user_id, id, id),
        public_url: format!("https://cdn.test/videos/{}/clip-{}.mp4", user_id, id),
        thumbnail_url: None,
        status: UploadStatus::Completed,
        thumbnail_status: None,
        thumbnail_started_at: None,
        detection_status: None,
        detection_started_at: None,
        duration: None,
        width: None,
        height: None,
        latitude: None,
        longitude: None,
        recorded_at: None,
        event_type: None,
        event_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        processed_at: None,
        deleted_at: None,
    }
}

fn set_pipeline(video: &mut Video, pipeline: Pipeline, status: Option<PipelineStatus>) {
    match pipeline {
        Pipeline::Thumbnail => video.thumbnail_status = status,
        Pipeline::Detection => video.detection_status = status,
    }
}

fn set_started_at(video: &mut Video, pipeline: Pipeline, at: Option<chrono::DateTime<Utc>>) {
    match pipeline {
        Pipeline::Thumbnail => video.thumbnail_started_at = at,
        Pipeline::Detection => video.detection_started_at = at,
    }
}

fn started_at(video: &Video, pipeline: Pipeline) -> Option<chrono::DateTime<Utc>> {
    match pipeline {
        Pipeline::Thumbnail => video.thumbnail_started_at,
        Pipeline::Detection => video.detection_started_at,
    }
}

/// In-memory [`VideoStore`] mirroring the repository's transition
/// semantics, including the COALESCE metadata merge.
#[derive(Default)]
pub struct MockStore {
    rows: Mutex<BTreeMap<i64, Video>>,
    next_id: AtomicI64,
}

impl MockStore {
    pub async fn put(&self, video: Video) {
        self.rows.lock().await.insert(video.id, video);
    }

    pub async fn get(&self, id: i64) -> Video {
        self.rows.lock().await.get(&id).expect("video missing").clone()
    }

    pub async fn insert_queued_video(&self, id: i64, user_id: i64) -> Video {
        let mut video = base_video(id, user_id);
        video.thumbnail_status = Some(PipelineStatus::Queued);
        self.put(video.clone()).await;
        video
    }

    pub async fn insert_processing_video(&self, id: i64, user_id: i64) -> Video {
        let mut video = base_video(id, user_id);
        video.thumbnail_status = Some(PipelineStatus::Processing);
        video.thumbnail_started_at = Some(Utc::now());
        self.put(video.clone()).await;
        video
    }

    pub async fn insert_stale_processing_video(&self, id: i64, user_id: i64) -> Video {
        let mut video = base_video(id, user_id);
        video.thumbnail_status = Some(PipelineStatus::Processing);
        video.thumbnail_started_at = Some(Utc::now() - ChronoDuration::hours(1));
        self.put(video.clone()).await;
        video
    }

    pub async fn insert_detection_processing_video(&self, id: i64, user_id: i64) -> Video {
        let mut video = base_video(id, user_id);
        video.detection_status = Some(PipelineStatus::Processing);
        video.detection_started_at = Some(Utc::now());
        video.latitude = Some(40.7128);
        video.longitude = Some(-74.006);
        video.recorded_at = Some(Utc::now() - ChronoDuration::hours(2));
        self.put(video.clone()).await;
        video
    }
}

#[async_trait]
impl VideoStore for MockStore {
    async fn create_video(&self, new: NewVideo) -> Result<Video, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut video = base_video(id, new.user_id);
        video.filename = new.filename;
        video.object_key = new.object_key;
        video.public_url = new.public_url;
        video.status = UploadStatus::PendingUpload;
        video.duration = new.duration;
        video.width = new.width;
        video.height = new.height;
        video.latitude = new.latitude;
        video.longitude = new.longitude;
        video.recorded_at = new.recorded_at;
        self.put(video.clone()).await;
        Ok(video)
    }

    async fn get_video(&self, id: i64) -> Result<Video, AppError> {
        self.rows
            .lock()
            .await
            .get(&id)
            .filter(|v| v.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))
    }

    async fn list_videos_by_concert(&self, concert_id: i64) -> Result<Vec<Video>, AppError> {
        let rows = self.rows.lock().await;
        let mut videos: Vec<Video> = rows
            .values()
            .filter(|v| {
                v.deleted_at.is_none()
                    && v.event_type.as_deref() == Some("concert")
                    && v.event_id == Some(concert_id)
            })
            .cloned()
            .collect();
        videos.sort_by(|a, b| {
            match (a.recorded_at, b.recorded_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
        });
        Ok(videos)
    }

    async fn list_videos_by_user(&self, user_id: i64) -> Result<Vec<Video>, AppError> {
        let rows = self.rows.lock().await;
        let mut videos: Vec<Video> = rows
            .values()
            .filter(|v| v.deleted_at.is_none() && v.user_id == user_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }

    async fn set_upload_status_completed(&self, id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
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
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
        video.status = UploadStatus::Failed;
        Ok(())
    }

    async fn claim_queued(&self, pipeline: Pipeline, limit: i64) -> Result<Vec<Video>, AppError> {
        let mut rows = self.rows.lock().await;
        let mut ids: Vec<i64> = rows
            .values()
            .filter(|v| {
                v.deleted_at.is_none() && v.pipeline_status(pipeline) == Some(PipelineStatus::Queued)
            })
            .map(|v| v.id)
            .collect();
        ids.sort_unstable();
        ids.truncate(limit.max(0) as usize);

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            let video = rows.get_mut(&id).expect("claimed row disappeared");
            set_pipeline(video, pipeline, Some(PipelineStatus::Processing));
            set_started_at(video, pipeline, Some(Utc::now()));
            claimed.push(video.clone());
        }
        Ok(claimed)
    }

    async fn set_pipeline_terminal(
        &self,
        pipeline: Pipeline,
        id: i64,
        status: PipelineStatus,
    ) -> Result<(), AppError> {
        assert!(status.is_terminal(), "non-terminal status {}", status);
        let mut rows = self.rows.lock().await;
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
        set_pipeline(video, pipeline, Some(status));
        Ok(())
    }

    async fn reset_stuck(&self, pipeline: Pipeline, older_than: Duration) -> Result<u64, AppError> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(older_than).expect("duration out of range");
        let mut rows = self.rows.lock().await;
        let mut reset = 0;
        for video in rows.values_mut() {
            if video.deleted_at.is_none()
                && video.pipeline_status(pipeline) == Some(PipelineStatus::Processing)
                && started_at(video, pipeline).is_some_and(|at| at <= cutoff)
            {
                set_pipeline(video, pipeline, Some(PipelineStatus::Queued));
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
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
        video.duration = video.duration.or(metadata.duration);
        video.width = video.width.or(metadata.width);
        video.height = video.height.or(metadata.height);
        let (lat, lng) = metadata
            .gps
            .map(|GpsCoordinates { latitude, longitude }| (Some(latitude), Some(longitude)))
            .unwrap_or((None, None));
        video.latitude = video.latitude.or(lat);
        video.longitude = video.longitude.or(lng);
        video.recorded_at = video.recorded_at.or(metadata.recorded_at);
        Ok(())
    }

    async fn set_thumbnail_url(&self, id: i64, url: &str) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
        video.thumbnail_url = Some(url.to_string());
        Ok(())
    }

    async fn set_video_concert(&self, id: i64, concert_id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
        video.event_type = Some("concert".to_string());
        video.event_id = Some(concert_id);
        Ok(())
    }

    async fn soft_delete_video(&self, id: i64, user_id: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let video = rows
            .get_mut(&id)
            .filter(|v| v.deleted_at.is_none() && v.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("video {} not found", id)))?;
        video.deleted_at = Some(Utc::now());
        Ok(())
    }
}

/// In-memory [`ObjectStorage`] with per-operation failure switches.
#[derive(Default)]
pub struct MockStorage {
    fail_presign: bool,
    fail_put: bool,
    put_calls: AtomicUsize,
}

impl MockStorage {
    pub fn failing_presign() -> Self {
        Self {
            fail_presign: true,
            ..Default::default()
        }
    }

    pub fn failing_put() -> Self {
        Self {
            fail_put: true,
            ..Default::default()
        }
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn create_multipart(&self, _key: &str, _content_type: &str) -> StorageResult<String> {
        Ok("upload-1".to_string())
    }

    async fn presign_part_urls(
        &self,
        key: &str,
        _upload_id: &str,
        part_count: usize,
    ) -> StorageResult<Vec<String>> {
        Ok((1..=part_count)
            .map(|n| format!("https://signed.test/{}?partNumber={}", key, n))
            .collect())
    }

    async fn complete_multipart(
        &self,
        _key: &str,
        _upload_id: &str,
        _parts: &[encore_core::models::UploadPart],
    ) -> StorageResult<()> {
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, _upload_id: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn presign_get(&self, key: &str, _ttl: Duration) -> StorageResult<String> {
        if self.fail_presign {
            return Err(StorageError::Presign("simulated presign failure".to_string()));
        }
        Ok(format!("https://signed.test/{}", key))
    }

    async fn put_object(
        &self,
        key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        if self.fail_put {
            return Err(StorageError::UploadFailed("simulated put failure".to_string()));
        }
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://cdn.test/{}", key))
    }

    async fn delete_object(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    fn cdn_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}

/// In-memory [`MediaProbe`] recording calls and offsets.
#[derive(Default)]
pub struct MockProbe {
    metadata: VideoMetadata,
    fail_probe: bool,
    fail_extract: bool,
    probe_calls: AtomicUsize,
    last_offset: Mutex<Option<f64>>,
}

impl MockProbe {
    pub fn with_metadata(metadata: VideoMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    pub fn failing_probe() -> Self {
        Self {
            fail_probe: true,
            ..Default::default()
        }
    }

    pub fn failing_extract() -> Self {
        Self {
            fail_extract: true,
            ..Default::default()
        }
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub async fn last_offset(&self) -> Option<f64> {
        *self.last_offset.lock().await
    }
}

#[async_trait]
impl MediaProbe for MockProbe {
    async fn probe(&self, _url: &str) -> Result<VideoMetadata, ProbeError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe {
            return Err(ProbeError::ProbeFailed("simulated probe failure".to_string()));
        }
        Ok(self.metadata.clone())
    }

    async fn extract_frame(&self, _url: &str, offset_seconds: f64) -> Result<Vec<u8>, ProbeError> {
        *self.last_offset.lock().await = Some(offset_seconds);
        if self.fail_extract {
            return Err(ProbeError::ExtractFailed(
                "simulated extract failure".to_string(),
            ));
        }
        // JPEG magic plus padding, close enough for a fake frame
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    }
}
