//! Team domain module
//!
//! Teams are created by a leader and grown through join codes. A user belongs to
//! at most one team.

mod code;
mod entity;
mod repository;
mod validation;

pub use code::TeamCodeGenerator;
pub use entity::{Member, MemberRole, Team, TeamCode, TeamId};
pub use repository::TeamRepository;
pub use validation::{
    validate_team_code, validate_team_description, validate_team_id, validate_team_name,
    TeamValidationError, TEAM_CODE_LENGTH,
};

#[cfg(test)]
pub use code::mock::ScriptedCodeGenerator;
