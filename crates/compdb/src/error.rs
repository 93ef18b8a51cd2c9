use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompDbError>;

/// Fatal errors. Unresolvable source paths are not errors; they surface as
/// [`crate::PathWarning`] values on the loaded entries.
#[derive(Error, Debug)]
pub enum CompDbError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed compilation database: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A record is missing a required field or carries an unusable command
    #[error("Invalid record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// A glob or regex could not be compiled
    #[error("Invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl CompDbError {
    pub fn invalid_record(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}
