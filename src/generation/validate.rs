//! Prompt validation.

use crate::error::{ValidationError, MAX_PROMPT_CHARS};

/// Checks a prompt before any network activity.
///
/// Emptiness is judged on the trimmed prompt; length is counted in raw
/// characters, surrounding whitespace included.
pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }

    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(ValidationError::PromptTooLong {
            length,
            max: MAX_PROMPT_CHARS,
        });
    }

    Ok(())
}
