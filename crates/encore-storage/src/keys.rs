//! Shared object key formats.
//!
//! Every key in the bucket is minted here so the layout stays in one place:
//! `videos/{user_id}/{uuid}_{filename}` for originals,
//! `thumbnails/{video_id}.jpg` for extracted thumbnails.

use uuid::Uuid;

/// Key for an uploaded video. The random component makes the key unique
/// even when a user uploads the same filename twice.
pub fn video_object_key(user_id: i64, filename: &str) -> String {
    format!("videos/{}/{}_{}", user_id, Uuid::new_v4(), filename)
}

/// Key for a video's extracted thumbnail.
pub fn thumbnail_object_key(video_id: i64) -> String {
    format!("thumbnails/{}.jpg", video_id)
}
