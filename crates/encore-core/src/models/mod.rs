pub mod metadata;
pub mod upload;
pub mod video;

pub use metadata::{GpsCoordinates, VideoMetadata};
pub use upload::{
    UploadConfirmRequest, UploadConfirmResponse, UploadInitRequest, UploadInitResponse, UploadPart,
};
pub use video::{NewVideo, Pipeline, PipelineStatus, UploadStatus, Video, VideoResponse};
