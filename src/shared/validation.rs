//! Validation Utilities

use validator::ValidationErrors;

use super::error::AppError;

/// Flatten validation errors into a single `field: message` line.
///
/// Only the first failing field is reported; clients fix one thing at a time.
pub fn describe(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .next()
        .unwrap_or_else(|| "Validation failed".into())
}

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    AppError::Validation(describe(&errors))
}
