//! On-disk persistence for Veridex jobs.
//!
//! One directory per job under the data root, holding the metadata
//! record, the completion marker, and the trained model artifact.
//! Export archives live next to the jobs directory with their own,
//! shorter retention.

pub mod jobs;
pub mod layout;

pub use jobs::JobStore;
pub use layout::DataLayout;
