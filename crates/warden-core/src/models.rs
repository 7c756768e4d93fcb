//! Domain models for Warden.
//!
//! These are the core types shared across all crates.

pub mod department;
pub mod membership;
pub mod organization;
pub mod role;
pub mod user;
