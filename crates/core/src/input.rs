//! Validation for free-text prediction/explanation input.

use crate::error::{CoreError, CoreResult};

/// Maximum length of a single text submitted for prediction or
/// explanation.
pub const MAX_INPUT_CHARS: usize = 1300;

/// Validate and clean a text input.
///
/// Strips null bytes and surrounding whitespace, rejects empty and
/// over-long texts.
pub fn validate_text(raw: &str) -> CoreResult<String> {
    let text: String = raw.chars().filter(|&c| c != '\0').collect();
    let text = text.trim().to_string();

    if text.is_empty() {
        return Err(CoreError::Validation("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_INPUT_CHARS {
        return Err(CoreError::Validation(format!(
            "Text exceeds maximum length of {MAX_INPUT_CHARS} characters"
        )));
    }
    Ok(text)
}
