//! Encore API: HTTP surface and service wiring for the video ingestion
//! core.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
