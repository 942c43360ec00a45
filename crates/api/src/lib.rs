//! Veridex API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! background jobs) so integration tests and the binary entrypoint can
//! both access them.

pub mod archive;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod progress;
pub mod response;
pub mod routes;
pub mod state;
pub mod trainer;
