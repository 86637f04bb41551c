//! Worker pool and periodic scheduler.
//!
//! The substrate every background pipeline runs on: a [`Pool`] of
//! long-lived workers draining a bounded in-process job channel, and a
//! [`Scheduler`] that polls a fetch function at a fixed interval using the
//! pool's free capacity as a credit hint. Durability lives in the database,
//! not here; losing the channel contents on shutdown is safe because
//! unfinished rows stay claimable.

mod pool;
mod scheduler;

pub use pool::{ErrorSink, Job, JobFuture, Pool};
pub use scheduler::{FetchFn, Scheduler};
