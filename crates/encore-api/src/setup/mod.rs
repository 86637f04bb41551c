//! Application assembly: database, services, routes, server.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use axum::Router;
use tokio_util::sync::CancellationToken;

use encore_core::Config;

use crate::state::AppState;

/// Connect to the database, build the services, start the background
/// pipelines, and return the ready-to-serve router.
pub async fn initialize_app(
    config: Config,
    cancel: CancellationToken,
) -> Result<(AppState, Router), anyhow::Error> {
    let pool = database::connect_and_migrate(&config).await?;
    let state = services::build_services(config, pool, cancel).await?;
    let router = routes::build_router(state.clone());
    Ok((state, router))
}
