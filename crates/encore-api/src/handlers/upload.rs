//! Upload protocol handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use encore_core::models::{
    UploadConfirmRequest, UploadConfirmResponse, UploadInitRequest, UploadInitResponse,
};

use crate::auth::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Initiate a chunked direct-to-storage upload.
#[utoipa::path(
    post,
    path = "/videos/upload/init",
    tag = "uploads",
    request_body = UploadInitRequest,
    responses(
        (status = 200, description = "Multipart upload initiated", body = UploadInitResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(user_id = user.user_id))]
pub async fn upload_init(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<UploadInitRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.uploads.init_upload(user.user_id, &request).await?;
    Ok(Json(response))
}

/// Confirm a finished multipart upload.
#[utoipa::path(
    post,
    path = "/videos/{id}/upload/confirm",
    tag = "uploads",
    params(("id" = i64, Path, description = "Video id")),
    request_body = UploadConfirmRequest,
    responses(
        (status = 200, description = "Upload completed", body = UploadConfirmResponse),
        (status = 400, description = "Invalid input or state", body = ErrorResponse),
        (status = 403, description = "Video owned by another user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(video_id = id, user_id = user.user_id))]
pub async fn upload_confirm(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UploadConfirmRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .uploads
        .confirm_upload(id, user.user_id, &request)
        .await?;
    Ok(Json(response))
}
