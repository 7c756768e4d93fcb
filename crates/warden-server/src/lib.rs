//! Warden Server: configuration, logging, start-up bootstrap and the
//! HTTP boundary over the authentication and provisioning services.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod secrets;
