//! OpenAPI document.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use encore_core::models::{
    PipelineStatus, UploadConfirmRequest, UploadConfirmResponse, UploadInitRequest,
    UploadInitResponse, UploadPart, UploadStatus, VideoResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::upload::upload_init,
        crate::handlers::upload::upload_confirm,
        crate::handlers::videos::get_video,
        crate::handlers::videos::list_concert_videos,
        crate::handlers::videos::list_user_videos,
        crate::handlers::videos::delete_video,
    ),
    components(schemas(
        UploadInitRequest,
        UploadInitResponse,
        UploadConfirmRequest,
        UploadConfirmResponse,
        UploadPart,
        UploadStatus,
        PipelineStatus,
        VideoResponse,
        ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Chunked direct-to-storage video uploads"),
        (name = "videos", description = "Video reads and deletion")
    )
)]
pub struct ApiDoc;
