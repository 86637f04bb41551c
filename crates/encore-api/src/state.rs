//! Application state.

use std::sync::Arc;

use encore_core::Config;
use encore_db::VideoStore;
use encore_pipelines::ThumbnailService;
use encore_storage::ObjectStorage;

use crate::services::upload::UploadService;

/// Everything handlers need, injected as small trait objects so the HTTP
/// layer never reaches around the services into concrete infrastructure.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub videos: Arc<dyn VideoStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub uploads: UploadService,
    pub thumbnails: Arc<ThumbnailService>,
}
