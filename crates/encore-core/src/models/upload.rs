use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::video::UploadStatus;

/// Request body for `POST /videos/upload/init`.
///
/// The optional metadata fields are whatever the client extracted locally
/// before uploading; they take precedence over anything the server probes
/// later.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadInitRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    #[validate(length(min = 1, message = "Content type is required"))]
    pub content_type: String,
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub size_bytes: i64,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

/// Response for `POST /videos/upload/init`: one presigned PUT URL per part.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadInitResponse {
    pub video_id: i64,
    pub upload_id: String,
    pub part_urls: Vec<String>,
    pub part_size: i64,
}

/// One completed part of a multipart upload. The etag is opaque and passed
/// back to the object store verbatim.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadPart {
    pub part_number: i32,
    pub etag: String,
}

/// Request body for `POST /videos/:id/upload/confirm`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfirmRequest {
    #[validate(length(min = 1, message = "Upload ID is required"))]
    pub upload_id: String,
    #[validate(length(min = 1, message = "At least one part is required"))]
    pub parts: Vec<UploadPart>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfirmResponse {
    pub video_id: i64,
    pub status: UploadStatus,
}
