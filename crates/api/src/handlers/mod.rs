//! HTTP handlers, grouped by resource.

pub mod downloads;
pub mod inference;
pub mod maintenance;
pub mod models;
pub mod training;
