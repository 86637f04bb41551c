//! ffprobe / ffmpeg subprocess wrappers.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::process::Command;

use encore_core::models::VideoMetadata;
use encore_core::AppError;

use crate::tags::{extract_gps, extract_timestamp};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("tool not available: {0}")]
    ToolNotAvailable(String),

    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),

    #[error("frame extraction failed: {0}")]
    ExtractFailed(String),

    #[error("failed to parse ffprobe output: {0}")]
    ParseFailed(#[from] serde_json::Error),
}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        AppError::Media(err.to_string())
    }
}

/// Contract over the external media tools. Both operations stream from a
/// URL; nothing touches the local disk.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Structural metadata (duration, dimensions, GPS, recording time).
    async fn probe(&self, url: &str) -> Result<VideoMetadata, ProbeError>;

    /// A single JPEG frame at `offset_seconds` into the video.
    async fn extract_frame(&self, url: &str, offset_seconds: f64) -> Result<Vec<u8>, ProbeError>;
}

// ffprobe -of json output shapes. Only the fields we read.

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<i32>,
    #[serde(default)]
    height: Option<i32>,
}

/// ffprobe/ffmpeg-backed implementation.
#[derive(Clone)]
pub struct FfmpegProbe {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegProbe {
    /// Verifies both binaries respond before accepting them; a missing tool
    /// should fail at startup, not on the first claimed job.
    pub async fn new(ffmpeg_path: String, ffprobe_path: String) -> Result<Self, ProbeError> {
        for path in [&ffmpeg_path, &ffprobe_path] {
            let status = Command::new(path)
                .arg("-version")
                .output()
                .await
                .map_err(|e| ProbeError::ToolNotAvailable(format!("{}: {}", path, e)))?;
            if !status.status.success() {
                return Err(ProbeError::ToolNotAvailable(path.clone()));
            }
        }
        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }

    fn parse_probe_output(raw: &[u8]) -> Result<VideoMetadata, ProbeError> {
        let probe: FfprobeOutput = serde_json::from_slice(raw)?;

        let mut metadata = VideoMetadata::default();

        if let Some(duration) = probe.format.duration.as_deref() {
            if let Ok(parsed) = duration.parse::<f64>() {
                metadata.duration = Some(parsed);
            }
        }

        if let Some(stream) = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
        {
            metadata.width = stream.width;
            metadata.height = stream.height;
        }

        match extract_gps(&probe.format.tags) {
            Ok(gps) => metadata.gps = gps,
            Err(e) => tracing::warn!(error = %e, "GPS tag present but unparsable"),
        }

        match extract_timestamp(&probe.format.tags) {
            Ok(ts) => metadata.recorded_at = ts,
            Err(e) => tracing::warn!(error = %e, "creation_time tag present but unparsable"),
        }

        Ok(metadata)
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    #[tracing::instrument(skip(self, url))]
    async fn probe(&self, url: &str) -> Result<VideoMetadata, ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-of", "json", "-show_format", "-show_streams"])
            .arg(url)
            .output()
            .await
            .map_err(|e| ProbeError::ProbeFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(ProbeError::ProbeFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Self::parse_probe_output(&output.stdout)
    }

    #[tracing::instrument(skip(self, url), fields(offset_seconds = offset_seconds))]
    async fn extract_frame(&self, url: &str, offset_seconds: f64) -> Result<Vec<u8>, ProbeError> {
        // -ss before -i is the fast seek; slightly imprecise is fine for a
        // thumbnail.
        let offset_arg = format!("{:.2}", offset_seconds);
        let output = Command::new(&self.ffmpeg_path)
            .args(["-ss", offset_arg.as_str(), "-i"])
            .arg(url)
            .args(["-frames:v", "1", "-f", "image2", "-c:v", "mjpeg", "-q:v", "3", "pipe:1"])
            .output()
            .await
            .map_err(|e| ProbeError::ExtractFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(ProbeError::ExtractFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        if output.stdout.is_empty() {
            return Err(ProbeError::ExtractFailed(
                "ffmpeg produced empty output".to_string(),
            ));
        }

        Ok(output.stdout)
    }
}
