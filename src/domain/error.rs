use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A unique index rejected a write (duplicate key)
    #[error("Unique constraint violated on {field}: {message}")]
    UniqueViolation { field: String, message: String },

    #[error("Could not allocate a unique team code: {message}")]
    CodeExhausted { message: String },

    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unique_violation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code_exhausted(message: impl Into<String>) -> Self {
        Self::CodeExhausted {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// True when the error is a duplicate-key rejection on the given field
    pub fn is_unique_violation_on(&self, expected: &str) -> bool {
        matches!(self, Self::UniqueViolation { field, .. } if field == expected)
    }

    /// Timeouts and outages, where a write may or may not have landed
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
