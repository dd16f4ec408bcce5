//! Integration tests for the InviteCode repository using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use prp_core::error::PortalError;
use prp_core::models::invite_code::CreateInviteCode;
use prp_core::repository::{InviteCodeRepository, Pagination};
use prp_db::repository::SurrealInviteCodeRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> SurrealInviteCodeRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    prp_db::run_migrations(&db).await.unwrap();
    SurrealInviteCodeRepository::new(db)
}

fn new_code(code: &str, max_uses: u32) -> CreateInviteCode {
    CreateInviteCode {
        code: code.into(),
        issued_by: "uid-issuer".into(),
        max_uses,
        invitee_domain: None,
        expires_at: None,
    }
}

#[tokio::test]
async fn create_and_get_code() {
    let repo = setup().await;

    let created = repo.create(new_code("PRP-AAAAAA", 3)).await.unwrap();
    assert_eq!(created.code, "PRP-AAAAAA");
    assert_eq!(created.current_uses, 0);
    assert!(created.active);

    let fetched = repo.get_by_code("PRP-AAAAAA").await.unwrap();
    assert_eq!(fetched.max_uses, 3);
    assert_eq!(fetched.issued_by, "uid-issuer");
}

#[tokio::test]
async fn colliding_code_is_rejected() {
    let repo = setup().await;
    repo.create(new_code("PRP-SAME00", 1)).await.unwrap();

    let err = repo.create(new_code("PRP-SAME00", 1)).await.unwrap_err();
    assert!(matches!(err, PortalError::AlreadyExists { .. }), "{err:?}");
}

#[tokio::test]
async fn consume_retires_code_at_max_uses() {
    let repo = setup().await;
    repo.create(new_code("PRP-TWOUSE", 2)).await.unwrap();
    let now = Utc::now();

    let first = repo.consume_use("PRP-TWOUSE", now).await.unwrap().unwrap();
    assert_eq!(first.current_uses, 1);
    assert!(first.active);

    let second = repo.consume_use("PRP-TWOUSE", now).await.unwrap().unwrap();
    assert_eq!(second.current_uses, 2);
    assert!(!second.active);

    let third = repo.consume_use("PRP-TWOUSE", now).await.unwrap();
    assert!(third.is_none(), "exhausted code must not be consumed");

    let stored = repo.get_by_code("PRP-TWOUSE").await.unwrap();
    assert_eq!(stored.current_uses, 2);
}

#[tokio::test]
async fn expired_code_is_not_consumed() {
    let repo = setup().await;
    repo.create(CreateInviteCode {
        expires_at: Some(Utc::now() - Duration::hours(1)),
        ..new_code("PRP-OLD000", 5)
    })
    .await
    .unwrap();

    let taken = repo.consume_use("PRP-OLD000", Utc::now()).await.unwrap();
    assert!(taken.is_none());
}

#[tokio::test]
async fn consume_missing_code_returns_none() {
    let repo = setup().await;
    let taken = repo.consume_use("PRP-NOPE00", Utc::now()).await.unwrap();
    assert!(taken.is_none());
}

#[tokio::test]
async fn release_gives_back_a_use() {
    let repo = setup().await;
    repo.create(new_code("PRP-ONCE00", 1)).await.unwrap();

    let taken = repo
        .consume_use("PRP-ONCE00", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert!(!taken.active);

    let released = repo.release_use("PRP-ONCE00").await.unwrap();
    assert_eq!(released.current_uses, 0);
    assert!(released.active);
}

#[tokio::test]
async fn deactivate_blocks_consumption() {
    let repo = setup().await;
    repo.create(new_code("PRP-REVOKE", 10)).await.unwrap();

    let revoked = repo.deactivate("PRP-REVOKE").await.unwrap();
    assert!(!revoked.active);

    let taken = repo.consume_use("PRP-REVOKE", Utc::now()).await.unwrap();
    assert!(taken.is_none());
}

#[tokio::test]
async fn release_keeps_revoked_code_inactive() {
    let repo = setup().await;
    repo.create(new_code("PRP-PULLED", 3)).await.unwrap();

    repo.consume_use("PRP-PULLED", Utc::now())
        .await
        .unwrap()
        .unwrap();
    repo.deactivate("PRP-PULLED").await.unwrap();

    let released = repo.release_use("PRP-PULLED").await.unwrap();
    assert_eq!(released.current_uses, 0);
    assert!(!released.active, "issuer revocation must survive a release");

    let taken = repo.consume_use("PRP-PULLED", Utc::now()).await.unwrap();
    assert!(taken.is_none());
}

#[tokio::test]
async fn list_by_issuer_only_returns_own_codes() {
    let repo = setup().await;
    repo.create(new_code("PRP-MINE01", 1)).await.unwrap();
    repo.create(new_code("PRP-MINE02", 1)).await.unwrap();
    repo.create(CreateInviteCode {
        issued_by: "uid-other".into(),
        ..new_code("PRP-THEIRS", 1)
    })
    .await
    .unwrap();

    let mine = repo
        .list_by_issuer("uid-issuer", Pagination::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 2);
    assert!(mine.items.iter().all(|c| c.issued_by == "uid-issuer"));
}
