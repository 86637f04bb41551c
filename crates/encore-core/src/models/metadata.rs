use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GPS coordinates read from container tags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Structural metadata extracted from a video file. Every field is optional;
/// merging into the database preserves existing non-null values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub gps: Option<GpsCoordinates>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl VideoMetadata {
    pub fn is_empty(&self) -> bool {
        self.duration.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.gps.is_none()
            && self.recorded_at.is_none()
    }
}
