//! Integration tests for the authentication service.

use chrono::{Duration, Utc};
use secrecy::SecretString;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use warden_auth::config::{AuthConfig, BootstrapConfig};
use warden_auth::provisioning::{
    AssignDepartmentInput, AssignOrganizationInput, CreateDepartmentInput, ProvisioningService,
};
use warden_auth::service::{AuthService, LoginInput, RegisterInput};
use warden_auth::token::TokenCodec;
use warden_auth::{Claims, TokenType};
use warden_core::error::WardenError;
use warden_core::models::organization::Organization;
use warden_core::models::role::Role;
use warden_core::models::user::UpdateUser;
use warden_core::repository::{Pagination, UserRepository};
use warden_db::repository::{
    SurrealDepartmentRepository, SurrealMembershipRepository, SurrealOrganizationRepository,
    SurrealUserRepository,
};

type Users = SurrealUserRepository<Db>;
type Members = SurrealMembershipRepository<Db>;
type Provisioning = ProvisioningService<
    Users,
    SurrealOrganizationRepository<Db>,
    SurrealDepartmentRepository<Db>,
    Members,
>;

const PASSWORD: &str = "correct-horse-battery";

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SecretString::from("integration-test-secret".to_string()),
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        ..AuthConfig::default()
    }
}

struct Harness {
    auth: AuthService<Users, Members>,
    provisioning: Provisioning,
    users: Users,
    root: Organization,
    admin_id: Uuid,
    alice: Uuid,
}

/// In-memory DB with a bootstrapped root organization and a regular
/// account `alice` whose primary organization is the root.
async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let config = test_config();
    let users = SurrealUserRepository::new(db.clone());
    let members = SurrealMembershipRepository::new(db.clone());
    let provisioning = ProvisioningService::new(
        users.clone(),
        SurrealOrganizationRepository::new(db.clone()),
        SurrealDepartmentRepository::new(db.clone()),
        members.clone(),
        &config,
    )
    .unwrap();
    let auth = AuthService::new(users.clone(), members, &config).unwrap();

    let bootstrap = provisioning
        .bootstrap_admin(&BootstrapConfig::default(), false)
        .await
        .unwrap();

    let alice = auth
        .register(RegisterInput {
            email: "alice@example.com".into(),
            username: "alice".into(),
            password: PASSWORD.into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            primary_organization_id: Some(bootstrap.organization.id),
        })
        .await
        .unwrap();

    Harness {
        auth,
        provisioning,
        users,
        root: bootstrap.organization,
        admin_id: bootstrap.admin.id,
        alice: alice.id,
    }
}

fn login(username: &str, password: &str, organization_id: Uuid) -> LoginInput {
    LoginInput {
        username: username.into(),
        password: password.into(),
        organization_id,
        department_id: None,
        role_id: None,
    }
}

fn decode(token: &str, token_type: TokenType) -> Claims {
    TokenCodec::from_config(&test_config())
        .unwrap()
        .decode(token, token_type)
        .unwrap()
}

#[tokio::test]
async fn bootstrapped_admin_can_log_in() {
    let h = setup().await;

    let outcome = h
        .auth
        .login(login("root-admin", "ChangeMe123!", h.root.id))
        .await
        .unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["user"]["is_super_admin"], true);
    assert_eq!(json["expires_in"], 900);
    assert!(json["user"].get("password_hash").is_none());

    assert_eq!(outcome.token_type, "Bearer");
    assert!(outcome.user.is_super_admin);
    assert_eq!(outcome.user.id, h.admin_id);
    assert_eq!(outcome.logged_organization.unwrap().id, h.root.id);
    assert!(outcome.logged_department.is_none());

    let claims = decode(&outcome.access_token, TokenType::Access);
    assert_eq!(claims.subject(), Some(h.admin_id));
    assert_eq!(claims.org_id, Some(h.root.id.to_string()));
    assert!(claims.is_super_admin);
    assert_eq!(claims.roles, Some(vec![Role::SYSTEM_ADMIN.to_string()]));
    let orgs = claims.organizations.unwrap();
    assert_eq!(orgs.len(), 1);
    assert!(orgs[0].is_primary);
    assert_eq!(orgs[0].name.as_deref(), Some("Root Organization"));
}

#[tokio::test]
async fn login_by_email() {
    let h = setup().await;
    let outcome = h
        .auth
        .login(login("alice@example.com", PASSWORD, h.root.id))
        .await
        .unwrap();
    assert_eq!(outcome.user.id, h.alice);
    assert!(!outcome.user.is_super_admin);
}

#[tokio::test]
async fn unknown_identifier_is_invalid_credentials() {
    let h = setup().await;
    let err = h
        .auth
        .login(login("nobody", PASSWORD, h.root.id))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::InvalidCredentials), "got {err:?}");
}

#[tokio::test]
async fn successful_login_stamps_last_login_and_resets_attempts() {
    let h = setup().await;
    h.auth
        .login(login("alice", "wrong-password", h.root.id))
        .await
        .unwrap_err();
    assert_eq!(h.users.get_by_id(h.alice).await.unwrap().login_attempts, 1);

    h.auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    let user = h.users.get_by_id(h.alice).await.unwrap();
    assert_eq!(user.login_attempts, 0);
    assert!(user.locked_until.is_none());
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
async fn fifth_failure_locks_the_account() {
    let h = setup().await;

    for attempt in 1..=4 {
        let err = h
            .auth
            .login(login("alice", "wrong-password", h.root.id))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::InvalidCredentials));
        let user = h.users.get_by_id(h.alice).await.unwrap();
        assert_eq!(user.login_attempts, attempt);
        assert!(user.locked_until.is_none(), "locked after {attempt} failures");
    }

    let err = h
        .auth
        .login(login("alice", "wrong-password", h.root.id))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::InvalidCredentials));

    let user = h.users.get_by_id(h.alice).await.unwrap();
    assert_eq!(user.login_attempts, 5);
    let until = user.locked_until.expect("locked on the fifth failure");
    assert!(until > Utc::now() + Duration::minutes(14));
}

#[tokio::test]
async fn locked_account_rejects_without_counting() {
    let h = setup().await;
    for _ in 0..5 {
        h.auth
            .login(login("alice", "wrong-password", h.root.id))
            .await
            .unwrap_err();
    }

    for password in [PASSWORD, "wrong-password"] {
        let err = h
            .auth
            .login(login("alice", password, h.root.id))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::AccountLocked), "got {err:?}");
    }

    let user = h.users.get_by_id(h.alice).await.unwrap();
    assert_eq!(user.login_attempts, 5);
}

#[tokio::test]
async fn expired_lock_allows_login_and_resets_counters() {
    let h = setup().await;
    for _ in 0..5 {
        h.auth
            .login(login("alice", "wrong-password", h.root.id))
            .await
            .unwrap_err();
    }
    h.users
        .set_locked_until(h.alice, Utc::now() - Duration::seconds(1))
        .await
        .unwrap();

    h.auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    let user = h.users.get_by_id(h.alice).await.unwrap();
    assert_eq!(user.login_attempts, 0);
    assert!(user.locked_until.is_none());
}

#[tokio::test]
async fn unlock_account_clears_lock() {
    let h = setup().await;
    for _ in 0..5 {
        h.auth
            .login(login("alice", "wrong-password", h.root.id))
            .await
            .unwrap_err();
    }

    h.auth.unlock_account(h.alice).await.unwrap();

    let user = h.users.get_by_id(h.alice).await.unwrap();
    assert_eq!(user.login_attempts, 0);
    assert!(user.locked_until.is_none());
    assert!(
        h.auth
            .login(login("alice", PASSWORD, h.root.id))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn inactive_account_is_rejected() {
    let h = setup().await;
    h.users
        .update(
            h.alice,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::AccountInactive), "got {err:?}");
}

#[tokio::test]
async fn login_requires_membership_in_requested_organization() {
    let h = setup().await;
    let err = h
        .auth
        .login(login("alice", PASSWORD, Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            WardenError::AuthorizationDenied { ref reason } if reason.contains("not a member")
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn restricted_role_cannot_log_into_organization() {
    let h = setup().await;
    h.provisioning
        .assign_user_to_organization(AssignOrganizationInput {
            user_id: h.alice,
            organization_id: h.root.id,
            role: Role::new("AUDITOR"),
            is_primary: true,
        })
        .await
        .unwrap();

    let err = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap_err();
    assert!(
        matches!(err, WardenError::AuthorizationDenied { ref reason } if reason.contains("role")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn requested_department_is_resolved_only_for_members() {
    let h = setup().await;
    let department = h
        .provisioning
        .create_department(CreateDepartmentInput {
            organization_id: h.root.id,
            parent_id: None,
            code: Some("ENG".into()),
            name: "Engineering".into(),
            kind: None,
            description: String::new(),
            function: String::new(),
            is_active: None,
        })
        .await
        .unwrap();

    let mut input = login("alice", PASSWORD, h.root.id);
    input.department_id = Some(department.id);
    let outcome = h.auth.login(input.clone()).await.unwrap();
    assert!(outcome.logged_department.is_none());

    h.provisioning
        .assign_user_to_department(AssignDepartmentInput {
            user_id: h.alice,
            department_id: department.id,
            role: Role::new("ENGINEER"),
            is_primary: true,
        })
        .await
        .unwrap();

    let outcome = h.auth.login(input).await.unwrap();
    assert_eq!(outcome.logged_department.unwrap().id, department.id);
    assert_eq!(outcome.user.primary_department_id, Some(department.id));

    let claims = decode(&outcome.access_token, TokenType::Access);
    let departments = claims.departments.unwrap();
    assert_eq!(departments[0].id, department.id.to_string());
    assert_eq!(departments[0].role.as_deref(), Some("ENGINEER"));
}

#[tokio::test]
async fn access_token_roundtrips_through_validation() {
    let h = setup().await;
    let outcome = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    assert_eq!(h.auth.validate_token(&outcome.access_token).unwrap(), h.alice);
}

#[tokio::test]
async fn token_types_are_not_interchangeable() {
    let h = setup().await;
    let outcome = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    assert!(matches!(
        h.auth.refresh(&outcome.access_token).await.unwrap_err(),
        WardenError::InvalidToken
    ));
    assert!(matches!(
        h.auth.validate_token(&outcome.refresh_token).unwrap_err(),
        WardenError::InvalidToken
    ));
}

#[tokio::test]
async fn foreign_and_tampered_tokens_are_rejected() {
    let h = setup().await;
    let outcome = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    let foreign = TokenCodec::new(
        &SecretString::from("some-other-secret".to_string()),
        "warden",
        "warden",
    )
    .unwrap();
    let mut claims = decode(&outcome.access_token, TokenType::Access);
    claims.is_super_admin = true;
    let forged = foreign.encode(&claims).unwrap();
    assert!(matches!(
        h.auth.validate_token(&forged).unwrap_err(),
        WardenError::InvalidToken
    ));

    let mut truncated = outcome.access_token.clone();
    truncated.pop();
    assert!(h.auth.validate_token(&truncated).is_err());
    assert!(h.auth.validate_token("not-a-jwt").is_err());
}

#[tokio::test]
async fn refresh_issues_a_fresh_pair_with_current_memberships() {
    let h = setup().await;
    let first = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    let department = h
        .provisioning
        .create_department(CreateDepartmentInput {
            organization_id: h.root.id,
            parent_id: None,
            code: None,
            name: "Support".into(),
            kind: None,
            description: String::new(),
            function: String::new(),
            is_active: None,
        })
        .await
        .unwrap();
    h.provisioning
        .assign_user_to_department(AssignDepartmentInput {
            user_id: h.alice,
            department_id: department.id,
            role: Role::unrestricted(),
            is_primary: false,
        })
        .await
        .unwrap();

    let refreshed = h.auth.refresh(&first.refresh_token).await.unwrap();
    assert_eq!(refreshed.token_type, "Bearer");
    assert!(refreshed.logged_organization.is_none());
    assert_ne!(refreshed.refresh_token, first.refresh_token);

    let claims = decode(&refreshed.access_token, TokenType::Access);
    assert_eq!(claims.departments.unwrap().len(), 1);

    // No server-side revocation: the old refresh token still works.
    assert!(h.auth.refresh(&first.refresh_token).await.is_ok());
}

#[tokio::test]
async fn refresh_rejects_deleted_or_inactive_subjects() {
    let h = setup().await;
    let outcome = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    h.users
        .update(
            h.alice,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        h.auth.refresh(&outcome.refresh_token).await.unwrap_err(),
        WardenError::InvalidToken
    ));

    h.users.delete(h.alice).await.unwrap();
    assert!(matches!(
        h.auth.refresh(&outcome.refresh_token).await.unwrap_err(),
        WardenError::InvalidToken
    ));
}

#[tokio::test]
async fn introspection_reports_active_and_inactive_tokens() {
    let h = setup().await;
    let outcome = h
        .auth
        .login(login("alice", PASSWORD, h.root.id))
        .await
        .unwrap();

    let active = h.auth.introspect(&outcome.refresh_token);
    assert!(active.active);
    assert_eq!(active.sub, Some(h.alice.to_string()));
    assert_eq!(active.username.as_deref(), Some("alice"));
    assert_eq!(active.organization_id, Some(h.root.id.to_string()));
    assert_eq!(active.token_type, Some(TokenType::Refresh));

    let inactive = h.auth.introspect("garbage");
    assert!(!inactive.active);
    assert_eq!(
        serde_json::to_value(&inactive).unwrap(),
        serde_json::json!({ "active": false })
    );
}

#[tokio::test]
async fn register_rejects_duplicates_and_short_passwords() {
    let h = setup().await;
    let input = |email: &str, username: &str, password: &str| RegisterInput {
        email: email.into(),
        username: username.into(),
        password: password.into(),
        first_name: String::new(),
        last_name: String::new(),
        primary_organization_id: None,
    };

    let err = h
        .auth
        .register(input("alice@example.com", "alice2", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::AlreadyExists { ref entity } if entity == "email"));

    let err = h
        .auth
        .register(input("alice2@example.com", "alice", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::AlreadyExists { ref entity } if entity == "username"));

    let err = h
        .auth
        .register(input("bob@example.com", "bob", "short"))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Validation { .. }));

    let bob = h
        .auth
        .register(input("bob@example.com", "bob", PASSWORD))
        .await
        .unwrap();
    assert!(bob.is_active);
    assert!(!bob.is_verified);
    assert!(!bob.is_super_admin);
    assert!(bob.primary_organization_id.is_none());
}

#[tokio::test]
async fn register_cannot_reuse_a_deleted_accounts_identifiers() {
    let h = setup().await;
    h.users.delete(h.alice).await.unwrap();

    let reuse = |email: &str, username: &str| RegisterInput {
        email: email.into(),
        username: username.into(),
        password: PASSWORD.into(),
        first_name: String::new(),
        last_name: String::new(),
        primary_organization_id: None,
    };

    let err = h
        .auth
        .register(reuse("alice@example.com", "new-alice"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, WardenError::AlreadyExists { ref entity } if entity == "email"),
        "got {err:?}"
    );

    let err = h
        .auth
        .register(reuse("new-alice@example.com", "alice"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, WardenError::AlreadyExists { ref entity } if entity == "username"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn registration_with_primary_organization_creates_membership() {
    let h = setup().await;
    let info = h.auth.user_info(h.alice).await.unwrap();

    assert_eq!(info.primary_organization_id, Some(h.root.id));
    assert_eq!(info.organizations.len(), 1);
    assert!(info.organizations[0].is_primary);
    assert_eq!(info.organizations[0].role, None);
    assert_eq!(
        info.organizations[0].organization_name.as_deref(),
        Some("Root Organization")
    );
}

#[tokio::test]
async fn list_users_pages_projections() {
    let h = setup().await;
    let page = h
        .auth
        .list_users(Pagination {
            offset: 0,
            limit: 1,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, h.admin_id);
    assert_eq!(page.items[0].organizations.len(), 1);
}
