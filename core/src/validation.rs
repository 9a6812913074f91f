//! Form checks run before a store action is invoked.
//!
//! The store never re-validates: anything rejected here must not reach it.

use thiserror::Error;

use crate::types::{CategoryInput, TodoInput};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please input the title!")]
    MissingTitle,

    #[error("Please select a priority!")]
    MissingPriority,

    #[error("Please input the category name!")]
    MissingName,

    #[error("Please input a color!")]
    MissingColor,

    #[error("Please enter a valid hex color (e.g., #FF5733), got {0:?}")]
    InvalidColor(String),
}

/// Whether `value` is `#RGB` or `#RRGGBB`, hex digits in either case.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Checks a todo form submission. Title and priority are required.
pub fn validate_todo_input(input: &TodoInput) -> Result<(), ValidationError> {
    match &input.title {
        Some(title) if !title.trim().is_empty() => {}
        _ => return Err(ValidationError::MissingTitle),
    }
    if input.priority.is_none() {
        return Err(ValidationError::MissingPriority);
    }
    Ok(())
}

pub fn validate_category_input(input: &CategoryInput) -> Result<(), ValidationError> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if input.color.is_empty() {
        return Err(ValidationError::MissingColor);
    }
    if !is_hex_color(&input.color) {
        return Err(ValidationError::InvalidColor(input.color.clone()));
    }
    Ok(())
}
