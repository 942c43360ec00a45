//! Domain logic for the Veridex deception-detection training service.
//!
//! Pure types and functions shared by the store, engine, and API crates:
//! the job record and its lifecycle, dataset validation and cleaning,
//! identifier generation, download progress, and expiry arithmetic.
//! No I/O happens here beyond what a caller injects.

pub mod catalog;
pub mod codes;
pub mod dataset;
pub mod error;
pub mod input;
pub mod job;
pub mod labels;
pub mod progress;
