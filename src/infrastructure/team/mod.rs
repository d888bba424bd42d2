//! Team infrastructure implementations

mod access;
mod code_generator;

pub use access::require_member;
pub use code_generator::RandomCodeGenerator;
