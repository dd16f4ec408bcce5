//! Integration tests for the PressRelease repository using in-memory
//! SurrealDB.

use prp_core::error::PortalError;
use prp_core::models::press_release::{
    CreatePressRelease, PressReleaseFields, ReleaseStatus,
};
use prp_core::repository::{Pagination, PressReleaseRepository};
use prp_db::repository::SurrealPressReleaseRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> SurrealPressReleaseRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    prp_db::run_migrations(&db).await.unwrap();
    SurrealPressReleaseRepository::new(db)
}

fn fields(headline: &str) -> PressReleaseFields {
    PressReleaseFields {
        headline: headline.into(),
        location: "Nairobi".into(),
        date: "2025-03-01".into(),
        what: "A solar cooperative opens".into(),
        who: "Local farmers".into(),
        when: "Saturday morning".into(),
        r#where: "Kibera community hall".into(),
        why: "Cheaper power".into(),
        how: "Shared panels".into(),
        website: "https://example.org".into(),
    }
}

fn release(owner: &str, headline: &str) -> CreatePressRelease {
    CreatePressRelease {
        owner_id: owner.into(),
        owner_email: format!("{owner}@example.com"),
        fields: fields(headline),
    }
}

#[tokio::test]
async fn create_and_get_release() {
    let repo = setup().await;

    let created = repo.create(release("owner", "Grand opening")).await.unwrap();
    assert_eq!(created.status, ReleaseStatus::PendingModeration);
    assert!(created.updated_at.is_none());

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.fields, fields("Grand opening"));
    assert_eq!(fetched.fields.r#where, "Kibera community hall");
}

#[tokio::test]
async fn update_fields_stamps_updated_at_and_keeps_status() {
    let repo = setup().await;
    let created = repo.create(release("owner", "Draft")).await.unwrap();
    repo.set_status(created.id, ReleaseStatus::Approved)
        .await
        .unwrap();

    let updated = repo
        .update_fields(created.id, fields("Final headline"))
        .await
        .unwrap();
    assert_eq!(updated.fields.headline, "Final headline");
    assert_eq!(updated.status, ReleaseStatus::Approved);
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn delete_removes_release() {
    let repo = setup().await;
    let created = repo.create(release("owner", "Short lived")).await.unwrap();

    repo.delete(created.id).await.unwrap();

    let err = repo.get_by_id(created.id).await.unwrap_err();
    assert!(matches!(err, PortalError::NotFound { .. }));
}

#[tokio::test]
async fn list_by_status_and_owner() {
    let repo = setup().await;
    let a = repo.create(release("owner-a", "A1")).await.unwrap();
    repo.create(release("owner-a", "A2")).await.unwrap();
    repo.create(release("owner-b", "B1")).await.unwrap();
    repo.set_status(a.id, ReleaseStatus::Approved).await.unwrap();

    let approved = repo
        .list_by_status(ReleaseStatus::Approved, Pagination::default())
        .await
        .unwrap();
    assert_eq!(approved.total, 1);
    assert_eq!(approved.items[0].id, a.id);

    let owned = repo
        .list_by_owner("owner-a", Pagination::default())
        .await
        .unwrap();
    assert_eq!(owned.total, 2);
    assert!(owned.items.iter().all(|r| r.owner_id == "owner-a"));
}
