//! Upload coordinator.
//!
//! Owns the two synchronous exchanges of the upload protocol (init and
//! confirm) plus deletion. The coordinator surfaces every error to the
//! request; cleanup along the way is best-effort and never masks the
//! primary failure.

use std::sync::Arc;
use validator::Validate;

use encore_core::models::{
    NewVideo, UploadConfirmRequest, UploadConfirmResponse, UploadInitRequest, UploadInitResponse,
    UploadStatus, Video,
};
use encore_core::AppError;
use encore_db::VideoStore;
use encore_pipelines::ThumbnailService;
use encore_storage::{calculate_part_count, calculate_part_size, keys, ObjectStorage};

/// 5 TiB, the object store's hard ceiling for a multipart object.
const MAX_FILE_SIZE: i64 = 5 * 1024 * 1024 * 1024 * 1024;

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn VideoStore>,
    storage: Arc<dyn ObjectStorage>,
    /// None disables the synchronous fan-out (tests, tooling); the
    /// scheduler path still picks the queued row up.
    thumbnails: Option<Arc<ThumbnailService>>,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn VideoStore>,
        storage: Arc<dyn ObjectStorage>,
        thumbnails: Option<Arc<ThumbnailService>>,
    ) -> Self {
        Self {
            store,
            storage,
            thumbnails,
        }
    }

    /// Initiate a multipart upload: validate, open the multipart session,
    /// mint one presigned PUT URL per part, persist the pending row.
    ///
    /// Failure after the session opens aborts it; an aborted init leaves no
    /// trace beyond logs.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename))]
    pub async fn init_upload(
        &self,
        user_id: i64,
        request: &UploadInitRequest,
    ) -> Result<UploadInitResponse, AppError> {
        request.validate()?;

        if !request.content_type.starts_with("video/") {
            return Err(AppError::Validation(format!(
                "invalid content type: {}, must be a video",
                request.content_type
            )));
        }
        if request.size_bytes > MAX_FILE_SIZE {
            return Err(AppError::Validation(
                "file too large: max size is 5TB".to_string(),
            ));
        }

        let part_size = calculate_part_size(request.size_bytes);
        let part_count = calculate_part_count(request.size_bytes, part_size);

        let object_key = keys::video_object_key(user_id, &request.filename);

        let upload_id = self
            .storage
            .create_multipart(&object_key, &request.content_type)
            .await?;

        let part_urls = match self
            .storage
            .presign_part_urls(&object_key, &upload_id, part_count)
            .await
        {
            Ok(urls) => urls,
            Err(e) => {
                self.abort_best_effort(&object_key, &upload_id).await;
                return Err(e.into());
            }
        };

        let new_video = NewVideo {
            user_id,
            filename: request.filename.clone(),
            object_key: object_key.clone(),
            public_url: self.storage.cdn_url(&object_key),
            duration: request.duration,
            width: request.width,
            height: request.height,
            latitude: request.latitude,
            longitude: request.longitude,
            recorded_at: request.recorded_at,
        };

        let video = match self.store.create_video(new_video).await {
            Ok(video) => video,
            Err(e) => {
                self.abort_best_effort(&object_key, &upload_id).await;
                return Err(e);
            }
        };

        tracing::info!(
            video_id = video.id,
            parts = part_count,
            part_size,
            "Upload initiated"
        );

        Ok(UploadInitResponse {
            video_id: video.id,
            upload_id,
            part_urls,
            part_size,
        })
    }

    /// Complete a multipart upload and hand the row to the background
    /// pipelines.
    ///
    /// The dual-write in `set_upload_status_completed` makes the thumbnail
    /// row claimable before the synchronous fan-out below runs, so the
    /// fan-out is purely a latency optimisation: losing it loses nothing.
    #[tracing::instrument(skip(self, request))]
    pub async fn confirm_upload(
        &self,
        video_id: i64,
        user_id: i64,
        request: &UploadConfirmRequest,
    ) -> Result<UploadConfirmResponse, AppError> {
        request.validate()?;

        let video = self.store.get_video(video_id).await?;

        if video.user_id != user_id {
            return Err(AppError::Unauthorized(
                "video does not belong to user".to_string(),
            ));
        }

        if video.status != UploadStatus::PendingUpload {
            return Err(AppError::Validation(format!(
                "video is not in pending_upload status (current: {})",
                video.status
            )));
        }

        if let Err(e) = self
            .storage
            .complete_multipart(&video.object_key, &request.upload_id, &request.parts)
            .await
        {
            self.abort_best_effort(&video.object_key, &request.upload_id)
                .await;
            if let Err(mark_err) = self.store.set_upload_status_failed(video_id).await {
                tracing::error!(video_id, error = %mark_err, "Failed to mark upload failed");
            }
            return Err(e.into());
        }

        self.store.set_upload_status_completed(video_id).await?;

        if let Some(thumbnails) = &self.thumbnails {
            thumbnails.extract_async(video);
        }

        tracing::info!(video_id, "Upload confirmed");

        Ok(UploadConfirmResponse {
            video_id,
            status: UploadStatus::Completed,
        })
    }

    /// Soft-delete a video and best-effort remove its object.
    #[tracing::instrument(skip(self))]
    pub async fn delete_video(&self, video_id: i64, user_id: i64) -> Result<(), AppError> {
        let video = self.store.get_video(video_id).await?;

        if video.user_id != user_id {
            return Err(AppError::Unauthorized(
                "video does not belong to user".to_string(),
            ));
        }

        if let Err(e) = self.storage.delete_object(&video.object_key).await {
            tracing::warn!(video_id, error = %e, "Object delete failed, row still soft-deleted");
        }

        self.store.soft_delete_video(video_id, user_id).await
    }

    pub async fn get_video(&self, video_id: i64) -> Result<Video, AppError> {
        self.store.get_video(video_id).await
    }

    pub async fn list_videos_by_concert(&self, concert_id: i64) -> Result<Vec<Video>, AppError> {
        self.store.list_videos_by_concert(concert_id).await
    }

    pub async fn list_videos_by_user(&self, user_id: i64) -> Result<Vec<Video>, AppError> {
        self.store.list_videos_by_user(user_id).await
    }

    async fn abort_best_effort(&self, key: &str, upload_id: &str) {
        if let Err(e) = self.storage.abort_multipart(key, upload_id).await {
            tracing::warn!(key, error = %e, "Best-effort multipart abort failed");
        }
    }
}
