//! Membership domain
//!
//! Contracts shared by the membership coordinator and its stores: the atomic
//! store trait and the read projection.

mod store;
mod view;

pub use store::{MembershipStore, ALREADY_IN_TEAM, ALREADY_MEMBER};
pub use view::{MemberView, TeamView};
