use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Upload lifecycle of a video row. Terminal states are idempotent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, sqlx::Type)]
#[sqlx(type_name = "upload_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    PendingUpload,
    Completed,
    Failed,
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::PendingUpload => write!(f, "pending_upload"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle of one background pipeline on a video row.
///
/// NULL in the database means the pipeline was never enqueued for the row;
/// allowed transitions are queued → processing → completed|failed, plus the
/// stuck-recovery reset processing → queued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, sqlx::Type)]
#[sqlx(type_name = "pipeline_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl Display for PipelineStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineStatus::Queued => write!(f, "queued"),
            PipelineStatus::Processing => write!(f, "processing"),
            PipelineStatus::Completed => write!(f, "completed"),
            PipelineStatus::Failed => write!(f, "failed"),
        }
    }
}

impl PipelineStatus {
    /// Whether `next` is a legal successor of `self` for a single pipeline.
    pub fn can_transition_to(self, next: PipelineStatus) -> bool {
        use PipelineStatus::*;
        matches!(
            (self, next),
            (Queued, Processing) | (Processing, Completed) | (Processing, Failed) | (Processing, Queued)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Completed | PipelineStatus::Failed)
    }
}

/// A background pipeline. Each variant owns a status/started_at column pair
/// on the videos table; adding a pipeline means adding a variant and its
/// two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Thumbnail,
    Detection,
}

impl Pipeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Pipeline::Thumbnail => "thumbnail",
            Pipeline::Detection => "detection",
        }
    }

    /// Column holding this pipeline's status.
    pub fn status_column(self) -> &'static str {
        match self {
            Pipeline::Thumbnail => "thumbnail_status",
            Pipeline::Detection => "detection_status",
        }
    }

    /// Column holding the timestamp of this pipeline's last claim.
    pub fn started_at_column(self) -> &'static str {
        match self {
            Pipeline::Thumbnail => "thumbnail_started_at",
            Pipeline::Detection => "detection_started_at",
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// An uploaded concert video.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    /// Path inside the object store. Never exposed over HTTP.
    pub object_key: String,
    pub public_url: String,
    pub thumbnail_url: Option<String>,
    pub status: UploadStatus,
    pub thumbnail_status: Option<PipelineStatus>,
    pub thumbnail_started_at: Option<DateTime<Utc>>,
    pub detection_status: Option<PipelineStatus>,
    pub detection_started_at: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Video {
    /// Status of the given pipeline on this row.
    pub fn pipeline_status(&self, pipeline: Pipeline) -> Option<PipelineStatus> {
        match pipeline {
            Pipeline::Thumbnail => self.thumbnail_status,
            Pipeline::Detection => self.detection_status,
        }
    }

    /// Whether the core metadata a probe would fill is already present.
    pub fn has_core_metadata(&self) -> bool {
        self.duration.is_some() && self.width.is_some() && self.height.is_some()
    }
}

/// Parameters for inserting a new video row. Metadata fields are whatever
/// the client extracted on its side; the server fills gaps later.
#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    pub user_id: i64,
    pub filename: String,
    pub object_key: String,
    pub public_url: String,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Video as returned over HTTP. The object key stays internal.
#[derive(Debug, Serialize, ToSchema)]
pub struct VideoResponse {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub status: UploadStatus,
    pub thumbnail_status: Option<PipelineStatus>,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            user_id: video.user_id,
            filename: video.filename,
            video_url: video.public_url,
            thumbnail_url: video.thumbnail_url,
            status: video.status,
            thumbnail_status: video.thumbnail_status,
            duration: video.duration,
            width: video.width,
            height: video.height,
            latitude: video.latitude,
            longitude: video.longitude,
            recorded_at: video.recorded_at,
            event_type: video.event_type,
            event_id: video.event_id,
            created_at: video.created_at,
            processed_at: video.processed_at,
        }
    }
}
