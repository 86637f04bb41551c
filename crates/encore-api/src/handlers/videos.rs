//! Video read/delete handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use encore_core::models::VideoResponse;

use crate::auth::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Fetch a single video.
#[utoipa::path(
    get,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = i64, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video", body = VideoResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state.uploads.get_video(id).await?;
    Ok(Json(VideoResponse::from(video)))
}

/// Videos belonging to one concert, in playback order.
#[utoipa::path(
    get,
    path = "/concerts/{id}/videos",
    tag = "videos",
    params(("id" = i64, Path, description = "Concert id")),
    responses(
        (status = 200, description = "Videos for the concert", body = [VideoResponse])
    )
)]
pub async fn list_concert_videos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let videos = state.uploads.list_videos_by_concert(id).await?;
    let responses: Vec<VideoResponse> = videos.into_iter().map(VideoResponse::from).collect();
    Ok(Json(responses))
}

/// A user's uploads, newest first.
#[utoipa::path(
    get,
    path = "/users/{id}/videos",
    tag = "videos",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Videos uploaded by the user", body = [VideoResponse])
    )
)]
pub async fn list_user_videos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let videos = state.uploads.list_videos_by_user(id).await?;
    let responses: Vec<VideoResponse> = videos.into_iter().map(VideoResponse::from).collect();
    Ok(Json(responses))
}

/// Soft-delete a video owned by the current user.
#[utoipa::path(
    delete,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = i64, Path, description = "Video id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Video owned by another user", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(video_id = id, user_id = user.user_id))]
pub async fn delete_video(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.uploads.delete_video(id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
