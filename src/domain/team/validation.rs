//! Team validation

use thiserror::Error;

/// Errors that can occur during team validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamValidationError {
    #[error("Team ID cannot be empty")]
    EmptyId,

    #[error("Team ID cannot exceed {0} characters")]
    IdTooLong(usize),

    #[error("Team ID can only contain alphanumeric characters and hyphens")]
    InvalidIdCharacters,

    #[error("Team name required")]
    EmptyName,

    #[error("Team name cannot exceed {0} characters")]
    NameTooLong(usize),

    #[error("Team description cannot exceed {0} characters")]
    DescriptionTooLong(usize),

    #[error("Code required")]
    EmptyCode,

    #[error("Team code must be {0} uppercase letters or digits")]
    InvalidCode(usize),

    #[error("User '{0}' is already a member of this team")]
    DuplicateMember(String),
}

const MAX_TEAM_ID_LENGTH: usize = 64;
const MAX_TEAM_NAME_LENGTH: usize = 100;
const MAX_TEAM_DESCRIPTION_LENGTH: usize = 500;

/// Length of every join code
pub const TEAM_CODE_LENGTH: usize = 8;

/// Validate a team ID
pub fn validate_team_id(id: &str) -> Result<(), TeamValidationError> {
    if id.is_empty() {
        return Err(TeamValidationError::EmptyId);
    }

    if id.len() > MAX_TEAM_ID_LENGTH {
        return Err(TeamValidationError::IdTooLong(MAX_TEAM_ID_LENGTH));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(TeamValidationError::InvalidIdCharacters);
    }

    Ok(())
}

/// Validate a team name. Whitespace-only names count as empty.
pub fn validate_team_name(name: &str) -> Result<(), TeamValidationError> {
    if name.trim().is_empty() {
        return Err(TeamValidationError::EmptyName);
    }

    if name.chars().count() > MAX_TEAM_NAME_LENGTH {
        return Err(TeamValidationError::NameTooLong(MAX_TEAM_NAME_LENGTH));
    }

    Ok(())
}

pub fn validate_team_description(description: &str) -> Result<(), TeamValidationError> {
    if description.chars().count() > MAX_TEAM_DESCRIPTION_LENGTH {
        return Err(TeamValidationError::DescriptionTooLong(
            MAX_TEAM_DESCRIPTION_LENGTH,
        ));
    }

    Ok(())
}

/// Validate a join code: exactly eight characters from `[A-Z0-9]`
pub fn validate_team_code(code: &str) -> Result<(), TeamValidationError> {
    if code.is_empty() {
        return Err(TeamValidationError::EmptyCode);
    }

    if code.len() != TEAM_CODE_LENGTH
        || !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(TeamValidationError::InvalidCode(TEAM_CODE_LENGTH));
    }

    Ok(())
}
