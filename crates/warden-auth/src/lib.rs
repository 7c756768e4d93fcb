//! Warden Auth: credential verification with lockout, JWT issuance
//! and validation, and tenant provisioning.

pub mod claims;
pub mod config;
pub mod error;
pub mod lockout;
pub mod password;
pub mod provisioning;
pub mod service;
pub mod token;

pub use claims::{Claims, TokenType};
pub use config::{AuthConfig, BootstrapConfig};
pub use error::AuthError;
pub use provisioning::{
    AssignDepartmentInput, AssignOrganizationInput, BootstrapOutcome, CreateDepartmentInput,
    CreateOrganizationInput, ProvisioningService,
};
pub use service::{AuthOutcome, AuthService, Introspection, LoginInput, RegisterInput};
pub use token::TokenCodec;
