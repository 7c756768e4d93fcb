//! Integration tests for the Organization and Department repositories
//! using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::error::WardenError;
use warden_core::models::department::{CreateDepartment, DepartmentKind};
use warden_core::models::organization::{CreateOrganization, UpdateOrganization};
use warden_core::repository::{DepartmentRepository, OrganizationRepository, Pagination};
use warden_db::repository::{SurrealDepartmentRepository, SurrealOrganizationRepository};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    db
}

fn org(name: &str, domain: Option<&str>) -> CreateOrganization {
    CreateOrganization {
        name: name.into(),
        description: String::new(),
        domain: domain.map(Into::into),
        parent_id: None,
        is_active: true,
    }
}

fn dept(organization_id: uuid::Uuid, name: &str) -> CreateDepartment {
    CreateDepartment {
        organization_id,
        parent_id: None,
        code: None,
        name: name.into(),
        kind: DepartmentKind::Department,
        description: String::new(),
        function: String::new(),
        is_active: true,
    }
}

#[tokio::test]
async fn organization_lookup_by_domain_and_name() {
    let repo = SurrealOrganizationRepository::new(setup().await);
    let acme = repo.create(org("ACME", Some("acme.io"))).await.unwrap();

    assert_eq!(repo.get_by_domain("acme.io").await.unwrap().id, acme.id);
    assert_eq!(repo.get_by_name("ACME").await.unwrap().id, acme.id);
    assert!(
        repo.get_by_domain("nope.io")
            .await
            .unwrap_err()
            .is_not_found("organization")
    );
}

#[tokio::test]
async fn blank_domain_is_stored_as_absent() {
    let repo = SurrealOrganizationRepository::new(setup().await);
    let a = repo.create(org("A", Some(""))).await.unwrap();
    let b = repo.create(org("B", None)).await.unwrap();

    assert!(a.domain.is_none());
    assert!(b.domain.is_none());
}

#[tokio::test]
async fn domain_index_rejects_a_second_holder() {
    let repo = SurrealOrganizationRepository::new(setup().await);
    repo.create(org("ACME", Some("acme.io"))).await.unwrap();

    // Only the unique index guards this layer.
    let err = repo.create(org("Copycat", Some("acme.io"))).await.unwrap_err();
    assert!(
        matches!(err, WardenError::AlreadyExists { ref entity } if entity == "organization domain"),
        "got {err:?}"
    );

    let other = repo.create(org("Other", Some("other.io"))).await.unwrap();
    let err = repo
        .update(
            other.id,
            UpdateOrganization {
                domain: Some("acme.io".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::AlreadyExists { .. }), "got {err:?}");
    assert_eq!(repo.list(Pagination::default()).await.unwrap().total, 2);
}

#[tokio::test]
async fn organization_update_and_children() {
    let repo = SurrealOrganizationRepository::new(setup().await);
    let root = repo.create(org("Root", None)).await.unwrap();
    let child = repo
        .create(CreateOrganization {
            parent_id: Some(root.id),
            ..org("Child", None)
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            root.id,
            UpdateOrganization {
                description: Some("top".into()),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "top");
    assert!(!updated.is_active);

    let children = repo.list_children(root.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);
    assert_eq!(children[0].parent_id, Some(root.id));

    let page = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn departments_by_organization_and_parent() {
    let db = setup().await;
    let orgs = SurrealOrganizationRepository::new(db.clone());
    let depts = SurrealDepartmentRepository::new(db);

    let acme = orgs.create(org("ACME", None)).await.unwrap();
    let other = orgs.create(org("Other", None)).await.unwrap();

    let eng = depts.create(dept(acme.id, "Engineering")).await.unwrap();
    let platform = depts
        .create(CreateDepartment {
            parent_id: Some(eng.id),
            code: Some("PLT".into()),
            kind: DepartmentKind::Team,
            ..dept(acme.id, "Platform")
        })
        .await
        .unwrap();
    depts.create(dept(other.id, "Sales")).await.unwrap();

    let fetched = depts.get_by_id(platform.id).await.unwrap();
    assert_eq!(fetched.kind, DepartmentKind::Team);
    assert_eq!(fetched.code.as_deref(), Some("PLT"));
    assert_eq!(fetched.parent_id, Some(eng.id));

    assert_eq!(depts.list_by_organization(acme.id).await.unwrap().len(), 2);
    let children = depts.list_children(eng.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, platform.id);

    assert!(
        depts
            .get_by_id(uuid::Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found("department")
    );
}
