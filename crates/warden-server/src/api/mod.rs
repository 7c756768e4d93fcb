//! HTTP boundary.
//!
//! Public routes authenticate with credentials or a token in the body.
//! Everything under `/v1/auth/admin` and `/v1/organizations/admin`
//! requires a super-admin access token.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use surrealdb::{Connection, Surreal};
use warden_auth::{AuthConfig, AuthService, ProvisioningService};
use warden_core::error::WardenResult;
use warden_db::repository::{
    SurrealDepartmentRepository, SurrealMembershipRepository, SurrealOrganizationRepository,
    SurrealUserRepository,
};

mod extract;
mod handlers;

pub use extract::{Authenticated, SuperAdmin};

pub type Auth<C> = AuthService<SurrealUserRepository<C>, SurrealMembershipRepository<C>>;

pub type Provisioning<C> = ProvisioningService<
    SurrealUserRepository<C>,
    SurrealOrganizationRepository<C>,
    SurrealDepartmentRepository<C>,
    SurrealMembershipRepository<C>,
>;

/// Services shared by every handler.
pub struct AppState<C: Connection> {
    pub auth: Arc<Auth<C>>,
    pub provisioning: Arc<Provisioning<C>>,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            provisioning: Arc::clone(&self.provisioning),
        }
    }
}

impl<C: Connection> AppState<C> {
    /// Wire both services to one database handle.
    pub fn new(db: &Surreal<C>, config: &AuthConfig) -> WardenResult<Self> {
        let auth = AuthService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealMembershipRepository::new(db.clone()),
            config,
        )?;
        let provisioning = ProvisioningService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealOrganizationRepository::new(db.clone()),
            SurrealDepartmentRepository::new(db.clone()),
            SurrealMembershipRepository::new(db.clone()),
            config,
        )?;
        Ok(Self {
            auth: Arc::new(auth),
            provisioning: Arc::new(provisioning),
        })
    }
}

pub fn router<C: Connection>(state: AppState<C>) -> Router {
    use handlers::{auth, health, organizations, users};

    let auth_admin = Router::new()
        .route("/users", get(users::list::<C>).post(users::create::<C>))
        .route("/users/{user_id}/unlock", post(users::unlock::<C>));

    let organization_admin = Router::new()
        .route(
            "/",
            post(organizations::create::<C>).get(organizations::list::<C>),
        )
        .route(
            "/organizations",
            post(organizations::create::<C>).get(organizations::list::<C>),
        )
        .route(
            "/organizations/{organization_id}/children",
            get(organizations::children::<C>),
        )
        .route(
            "/organizations/{organization_id}/departments",
            post(organizations::create_department::<C>).get(organizations::departments::<C>),
        )
        .route(
            "/organizations/{organization_id}/members",
            post(organizations::assign_member::<C>),
        )
        .route(
            "/departments/{department_id}/children",
            get(organizations::department_children::<C>),
        )
        .route(
            "/departments/{department_id}/members",
            post(organizations::assign_department_member::<C>),
        )
        .route(
            "/users/{user_id}/organizations",
            get(organizations::user_organizations::<C>),
        )
        .route(
            "/users/{user_id}/organizations/{organization_id}",
            delete(organizations::remove_member::<C>),
        )
        .route(
            "/users/{user_id}/departments",
            get(organizations::user_departments::<C>),
        )
        .route(
            "/users/{user_id}/departments/{department_id}",
            delete(organizations::remove_department_member::<C>),
        );

    Router::new()
        .route("/v1/health", get(health::health))
        .route("/v1/login", post(auth::login::<C>))
        .route("/refresh", post(auth::refresh::<C>))
        .route("/v1/auth/me", get(auth::me::<C>))
        .route("/v1/token/introspect", post(auth::introspect::<C>))
        .nest("/v1/auth/admin", auth_admin)
        .nest("/v1/organizations/admin", organization_admin)
        .with_state(state)
}
