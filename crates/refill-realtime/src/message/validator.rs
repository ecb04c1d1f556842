//! Inbound frame validation rules.

use refill_core::error::AppError;

/// Validates the raw text of an inbound frame before parsing.
pub fn validate_inbound(raw: &str, max_size: usize) -> Result<(), AppError> {
    if raw.len() > max_size {
        return Err(AppError::protocol(format!(
            "Frame exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::protocol("Empty frame"));
    }

    Ok(())
}
