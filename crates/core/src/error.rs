#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {code}")]
    NotFound { entity: &'static str, code: String },

    /// The entity exists on disk but is past its retention window.
    /// Distinct from [`CoreError::NotFound`] so callers can answer
    /// "gone" instead of "never existed".
    #[error("{entity} has expired: {code}")]
    Expired { entity: &'static str, code: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Identifier keyspace exhausted after {attempts} attempts")]
    ExhaustedKeyspace { attempts: u32 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
