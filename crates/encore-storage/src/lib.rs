//! Object storage for encore.
//!
//! [`ObjectStorage`] is the trait the upload coordinator and the pipelines
//! depend on; [`S3Storage`] is the production implementation over any
//! S3-compatible provider. Part sizing policy and object key formats live
//! here too since they are storage concerns.

pub mod client;
pub mod keys;
pub mod part;
mod s3;

pub use client::{ObjectStorage, StorageError, StorageResult};
pub use part::{calculate_part_count, calculate_part_size, MAX_PARTS, MIN_PART_SIZE};
pub use s3::S3Storage;
