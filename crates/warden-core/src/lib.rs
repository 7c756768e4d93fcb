//! Warden Core: domain models, error types and the storage traits
//! the authentication core is written against.

pub mod error;
pub mod models;
pub mod repository;
