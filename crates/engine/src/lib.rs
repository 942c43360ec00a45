//! Model training, inference, and explanation.
//!
//! The backend seam ([`ClassifierBackend`]) separates the service from
//! any one model family. The default backend is a hashed bag-of-words
//! linear classifier: fast, dependency-free, and good enough to carry
//! the full train/predict/explain lifecycle.

pub mod backend;
pub mod cache;
pub mod device;
pub mod explain;
pub mod linear;
pub mod resolver;

pub use backend::{ClassifierBackend, FitMetrics, FitParams, Model, Prediction};
pub use cache::{InferenceCache, InferenceObject};
pub use device::Device;
pub use linear::LinearBackend;
pub use resolver::{BaseModelResolver, LocalRegistryResolver};
