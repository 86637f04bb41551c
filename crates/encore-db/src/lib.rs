//! Database layer for encore.
//!
//! [`VideoStore`] is the persistence contract the upload coordinator and
//! the background pipelines are written against; [`VideoRepository`] is the
//! Postgres implementation. All state transitions are single atomic
//! statements, and cross-instance claim safety rides entirely on
//! `FOR UPDATE SKIP LOCKED`.

pub mod store;
pub mod videos;

pub use store::VideoStore;
pub use videos::VideoRepository;

/// Embedded migrations for the videos schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
