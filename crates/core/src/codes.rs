//! Job code generation and validation.
//!
//! Jobs are identified by 6-character lowercase alphanumeric codes.
//! The keyspace (36^6, roughly 2.1 billion) makes collisions among
//! concurrently live jobs negligible, so generation is rejection
//! sampling against an existence probe rather than a counter.

use rand::Rng;

use crate::error::{CoreError, CoreResult};

/// Length of a job code.
pub const CODE_LEN: usize = 6;

/// Characters a job code may contain.
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Retry cap for [`generate_code`]. Hitting it means the probe reported
/// every sampled code as taken, which in practice indicates a broken
/// probe rather than a full keyspace.
pub const MAX_CODE_ATTEMPTS: u32 = 100;

/// Sample one random code. Makes no uniqueness guarantee on its own.
pub fn sample_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a code for which `taken` returns `false`.
///
/// Signals [`CoreError::ExhaustedKeyspace`] after [`MAX_CODE_ATTEMPTS`]
/// rejected samples.
pub fn generate_code(mut taken: impl FnMut(&str) -> bool) -> CoreResult<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = sample_code();
        if !taken(&code) {
            return Ok(code);
        }
    }
    Err(CoreError::ExhaustedKeyspace {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

/// Validate a caller-supplied job code, returning its canonical
/// (lowercase) form.
pub fn validate_code(raw: &str) -> CoreResult<String> {
    let code = raw.trim();
    if code.len() != CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::Validation(format!(
            "Job code must be exactly {CODE_LEN} alphanumeric characters"
        )));
    }
    Ok(code.to_ascii_lowercase())
}
