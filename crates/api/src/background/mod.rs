//! Background maintenance loops.
//!
//! Each loop runs until its [`CancellationToken`] fires and performs an
//! initial pass at startup so a restart never postpones cleanup.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod archive_sweep;
pub mod job_sweep;
