//! Field validation shared by board, column and task models.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static MIME_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]+/[a-z0-9][a-z0-9!#$&^_.+-]*$").expect("static MIME pattern compiles")
});

/// Validation failure for user-supplied model fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name/title/comment is blank after trim.
    BlankField(&'static str),
    /// Attachment type is not `type/subtype`.
    InvalidFileType(String),
    /// Attachment size is negative.
    NegativeFileSize(i64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidFileType(value) => write!(f, "invalid attachment file type `{value}`"),
            Self::NegativeFileSize(size) => {
                write!(f, "attachment file size must be >= 0, got {size}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects the empty result.
pub fn normalize_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Lowercases and checks an attachment MIME type.
pub fn normalize_file_type(value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_ascii_lowercase();
    if !MIME_TYPE.is_match(&normalized) {
        return Err(ValidationError::InvalidFileType(value.to_string()));
    }
    Ok(normalized)
}
