//! API layer - HTTP endpoints and middleware

pub mod auth;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod router;
pub mod state;
pub mod tasks;
pub mod team;
pub mod types;

#[cfg(test)]
mod test_support;

pub use middleware::RequireUser;
pub use router::create_router_with_state;
pub use state::AppState;
