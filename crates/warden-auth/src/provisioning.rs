//! Tenant provisioning: organizations, departments, memberships and the
//! bootstrap administrator.
//!
//! Every operation here is safe to repeat. `bootstrap_admin` in
//! particular runs on each process start.

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::department::{CreateDepartment, Department, DepartmentKind};
use warden_core::models::membership::{DepartmentMembership, OrganizationMembership};
use warden_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use warden_core::models::role::Role;
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::repository::{
    DepartmentRepository, MembershipRepository, OrganizationRepository, PaginatedResult,
    Pagination, UserRepository,
};

use crate::config::{AuthConfig, BootstrapConfig};
use crate::password::PasswordService;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartmentInput {
    pub organization_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub kind: Option<DepartmentKind>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignOrganizationInput {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignDepartmentInput {
    pub user_id: Uuid,
    pub department_id: Uuid,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_primary: bool,
}

/// The root organization and its administrator after bootstrap.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapOutcome {
    pub organization: Organization,
    pub admin: User,
}

pub struct ProvisioningService<U, O, D, M>
where
    U: UserRepository,
    O: OrganizationRepository,
    D: DepartmentRepository,
    M: MembershipRepository,
{
    users: U,
    organizations: O,
    departments: D,
    memberships: M,
    passwords: PasswordService,
    min_password_length: usize,
}

impl<U, O, D, M> ProvisioningService<U, O, D, M>
where
    U: UserRepository,
    O: OrganizationRepository,
    D: DepartmentRepository,
    M: MembershipRepository,
{
    pub fn new(
        users: U,
        organizations: O,
        departments: D,
        memberships: M,
        config: &AuthConfig,
    ) -> WardenResult<Self> {
        Ok(Self {
            users,
            organizations,
            departments,
            memberships,
            passwords: PasswordService::from_config(config)?,
            min_password_length: config.min_password_length,
        })
    }

    /// Find-or-create keyed by domain, then by name. A match is
    /// reactivated and its description and domain are overwritten by
    /// non-empty differing values.
    pub async fn ensure_organization(
        &self,
        name: &str,
        description: &str,
        domain: &str,
    ) -> WardenResult<Organization> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WardenError::validation("organization name is required"));
        }
        let description = description.trim();
        let domain = domain.trim().to_lowercase();

        let mut existing = None;
        if !domain.is_empty() {
            existing = found(self.organizations.get_by_domain(&domain).await, "organization")?;
        }
        if existing.is_none() {
            existing = found(self.organizations.get_by_name(name).await, "organization")?;
        }

        let Some(org) = existing else {
            let org = self
                .organizations
                .create(CreateOrganization {
                    name: name.to_string(),
                    description: description.to_string(),
                    domain: (!domain.is_empty()).then_some(domain),
                    parent_id: None,
                    is_active: true,
                })
                .await?;
            info!(organization_id = %org.id, name = %org.name, "organization created");
            return Ok(org);
        };

        let update = UpdateOrganization {
            description: (!description.is_empty() && org.description != description)
                .then(|| description.to_string()),
            domain: (!domain.is_empty() && org.domain.as_deref() != Some(domain.as_str()))
                .then_some(domain),
            is_active: Some(true),
            ..UpdateOrganization::default()
        };
        let org = self.organizations.update(org.id, update).await?;
        debug!(organization_id = %org.id, "organization ensured");
        Ok(org)
    }

    /// Ensure the root organization and its administrator. A soft-deleted
    /// administrator is restored in place. The password is rehashed only
    /// when forced or when the stored hash no longer matches.
    pub async fn bootstrap_admin(
        &self,
        input: &BootstrapConfig,
        force_password_reset: bool,
    ) -> WardenResult<BootstrapOutcome> {
        let organization = self
            .ensure_organization(
                &input.organization_name,
                &input.organization_description,
                &input.organization_domain,
            )
            .await?;

        let email = input.admin_email.trim();
        if email.is_empty() {
            return Err(WardenError::validation("bootstrap admin email is required"));
        }
        let username = match input.admin_username.trim() {
            "" => email,
            username => username,
        };
        let password = input.admin_password.expose_secret();
        self.check_password_length(password)?;

        let existing = match found(self.users.get_by_email(email).await, "user")? {
            Some(existing) => Some(existing),
            None => {
                let restored = found(self.users.restore_by_email(email).await, "user")?;
                if let Some(admin) = &restored {
                    info!(user_id = %admin.id, "deleted bootstrap administrator restored");
                }
                restored
            }
        };

        let admin = match existing {
            None => {
                let password_hash = self.passwords.hash_blocking(password.to_string()).await?;
                let admin = self
                    .users
                    .create(CreateUser {
                        email: email.to_string(),
                        username: username.to_string(),
                        password_hash,
                        first_name: or_default(&input.admin_first_name, "System"),
                        last_name: or_default(&input.admin_last_name, "Administrator"),
                        is_active: true,
                        is_verified: true,
                        is_super_admin: true,
                    })
                    .await?;
                info!(user_id = %admin.id, "bootstrap administrator created");
                admin
            }
            Some(existing) => {
                let matches = self
                    .passwords
                    .verify_blocking(password.to_string(), existing.password_hash.clone())
                    .await;
                let password_hash = if force_password_reset || !matches!(matches, Ok(true)) {
                    Some(self.passwords.hash_blocking(password.to_string()).await?)
                } else {
                    None
                };
                let rehashed = password_hash.is_some();

                let admin = self
                    .users
                    .update(
                        existing.id,
                        UpdateUser {
                            username: Some(username.to_string()),
                            first_name: Some(or_default(
                                &input.admin_first_name,
                                &existing.first_name,
                            )),
                            last_name: Some(or_default(
                                &input.admin_last_name,
                                &existing.last_name,
                            )),
                            password_hash,
                            is_active: Some(true),
                            is_verified: Some(true),
                            is_super_admin: Some(true),
                            ..UpdateUser::default()
                        },
                    )
                    .await?;
                info!(user_id = %admin.id, rehashed, "bootstrap administrator updated");
                admin
            }
        };

        self.memberships
            .assign_organization(admin.id, organization.id, Role::system_admin(), true)
            .await?;
        let admin = self.users.get_by_id(admin.id).await?;

        Ok(BootstrapOutcome {
            organization,
            admin,
        })
    }

    pub async fn create_organization(
        &self,
        input: CreateOrganizationInput,
    ) -> WardenResult<Organization> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(WardenError::validation("organization name is required"));
        }
        let domain = input
            .domain
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());

        if let Some(parent_id) = input.parent_id {
            self.organizations.get_by_id(parent_id).await?;
        }
        if let Some(domain) = &domain {
            if found(self.organizations.get_by_domain(domain).await, "organization")?.is_some() {
                return Err(WardenError::AlreadyExists {
                    entity: "organization domain".into(),
                });
            }
        }

        let org = self
            .organizations
            .create(CreateOrganization {
                name: name.to_string(),
                description: input.description.trim().to_string(),
                domain,
                parent_id: input.parent_id,
                is_active: input.is_active.unwrap_or(true),
            })
            .await?;
        info!(organization_id = %org.id, name = %org.name, "organization created");
        Ok(org)
    }

    pub async fn create_department(
        &self,
        input: CreateDepartmentInput,
    ) -> WardenResult<Department> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(WardenError::validation("department name is required"));
        }

        self.organizations.get_by_id(input.organization_id).await?;
        if let Some(parent_id) = input.parent_id {
            let parent = self.departments.get_by_id(parent_id).await?;
            if parent.organization_id != input.organization_id {
                return Err(WardenError::validation(
                    "parent department belongs to another organization",
                ));
            }
        }

        let department = self
            .departments
            .create(CreateDepartment {
                organization_id: input.organization_id,
                parent_id: input.parent_id,
                code: input
                    .code
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
                name: name.to_string(),
                kind: input.kind.unwrap_or_default(),
                description: input.description.trim().to_string(),
                function: input.function.trim().to_string(),
                is_active: input.is_active.unwrap_or(true),
            })
            .await?;
        info!(
            department_id = %department.id,
            organization_id = %department.organization_id,
            "department created"
        );
        Ok(department)
    }

    pub async fn list_organizations(
        &self,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Organization>> {
        self.organizations.list(pagination).await
    }

    pub async fn list_child_organizations(
        &self,
        parent_id: Uuid,
    ) -> WardenResult<Vec<Organization>> {
        self.organizations.list_children(parent_id).await
    }

    pub async fn list_departments(&self, organization_id: Uuid) -> WardenResult<Vec<Department>> {
        self.organizations.get_by_id(organization_id).await?;
        self.departments.list_by_organization(organization_id).await
    }

    pub async fn list_child_departments(&self, parent_id: Uuid) -> WardenResult<Vec<Department>> {
        self.departments.list_children(parent_id).await
    }

    pub async fn assign_user_to_organization(
        &self,
        input: AssignOrganizationInput,
    ) -> WardenResult<OrganizationMembership> {
        self.users.get_by_id(input.user_id).await?;
        self.organizations.get_by_id(input.organization_id).await?;

        let membership = self
            .memberships
            .assign_organization(
                input.user_id,
                input.organization_id,
                input.role,
                input.is_primary,
            )
            .await?;
        info!(
            user_id = %input.user_id,
            organization_id = %input.organization_id,
            is_primary = input.is_primary,
            "organization membership assigned"
        );
        Ok(membership)
    }

    pub async fn assign_user_to_department(
        &self,
        input: AssignDepartmentInput,
    ) -> WardenResult<DepartmentMembership> {
        self.users.get_by_id(input.user_id).await?;
        self.departments.get_by_id(input.department_id).await?;

        let membership = self
            .memberships
            .assign_department(input.user_id, input.department_id, input.role, input.is_primary)
            .await?;
        info!(
            user_id = %input.user_id,
            department_id = %input.department_id,
            is_primary = input.is_primary,
            "department membership assigned"
        );
        Ok(membership)
    }

    pub async fn list_user_organizations(
        &self,
        user_id: Uuid,
    ) -> WardenResult<Vec<OrganizationMembership>> {
        self.users.get_by_id(user_id).await?;
        self.memberships.list_user_organizations(user_id).await
    }

    pub async fn list_user_departments(
        &self,
        user_id: Uuid,
    ) -> WardenResult<Vec<DepartmentMembership>> {
        self.users.get_by_id(user_id).await?;
        self.memberships.list_user_departments(user_id).await
    }

    pub async fn remove_user_from_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> WardenResult<()> {
        self.memberships
            .remove_organization(user_id, organization_id)
            .await?;
        info!(%user_id, %organization_id, "organization membership removed");
        Ok(())
    }

    pub async fn remove_user_from_department(
        &self,
        user_id: Uuid,
        department_id: Uuid,
    ) -> WardenResult<()> {
        self.memberships
            .remove_department(user_id, department_id)
            .await?;
        info!(%user_id, %department_id, "department membership removed");
        Ok(())
    }

    fn check_password_length(&self, password: &str) -> WardenResult<()> {
        if password.chars().count() < self.min_password_length {
            return Err(WardenError::validation(format!(
                "password must be at least {} characters long",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

/// Turn a not-found lookup into `None`.
fn found<T>(lookup: WardenResult<T>, entity: &str) -> WardenResult<Option<T>> {
    match lookup {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found(entity) => Ok(None),
        Err(e) => Err(e),
    }
}

fn or_default(value: &str, fallback: &str) -> String {
    match value.trim() {
        "" => fallback.to_string(),
        trimmed => trimmed.to_string(),
    }
}
