//! Core error types for LEAFRENDER.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid encoding
    InvalidEncoding,

    /// Template name is empty
    EmptyTemplateName,

    /// Duplicate template name within one batch
    DuplicateTemplate {
        /// The repeated name
        name: String,
    },

    /// Component identifier is empty
    EmptyComponentId,

    /// Validation error
    Validation {
        /// Field that failed validation
        field: String,
        /// Why it failed
        reason: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "Invalid encoding"),
            Self::EmptyTemplateName => write!(f, "Template name must not be empty"),
            Self::DuplicateTemplate { name } => {
                write!(f, "Duplicate template name in batch: {}", name)
            }
            Self::EmptyComponentId => write!(f, "Component identifier must not be empty"),
            Self::Validation { field, reason } => {
                write!(f, "Validation failed for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(_err: serde_json::Error) -> Self {
        Self::InvalidEncoding
    }
}
