//! SurrealDB repository implementations.

mod common;
mod department;
mod membership;
mod organization;
mod user;

pub use department::SurrealDepartmentRepository;
pub use membership::SurrealMembershipRepository;
pub use organization::SurrealOrganizationRepository;
pub use user::SurrealUserRepository;
