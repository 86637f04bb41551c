//! Route table.

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(openapi))
        .route("/videos/upload/init", post(handlers::upload::upload_init))
        .route(
            "/videos/{id}/upload/confirm",
            post(handlers::upload::upload_confirm),
        )
        .route(
            "/videos/{id}",
            get(handlers::videos::get_video).delete(handlers::videos::delete_video),
        )
        .route(
            "/concerts/{id}/videos",
            get(handlers::videos::list_concert_videos),
        )
        .route(
            "/users/{id}/videos",
            get(handlers::videos::list_user_videos),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
