//! Membership infrastructure: stores and the coordinator service

mod in_memory;
mod postgres;
mod service;

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;
pub use service::{MembershipConfig, MembershipService};
