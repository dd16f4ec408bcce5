//! Integration tests for the EndorsementRequest repository using in-memory
//! SurrealDB.

use prp_core::error::PortalError;
use prp_core::models::endorsement::{CreateEndorsementRequest, EndorsementStatus};
use prp_core::repository::{EndorsementRepository, Pagination};
use prp_db::repository::SurrealEndorsementRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    prp_db::run_migrations(&db).await.unwrap();
    db
}

async fn setup() -> SurrealEndorsementRepository<Db> {
    SurrealEndorsementRepository::new(setup_db().await)
}

async fn pair_locks(db: &Surreal<Db>) -> Vec<String> {
    let mut result = db
        .query("SELECT VALUE request_id FROM pending_endorsement")
        .await
        .unwrap();
    result.take(0).unwrap()
}

fn request(requester: &str, target: &str) -> CreateEndorsementRequest {
    CreateEndorsementRequest {
        requester_id: requester.into(),
        requester_email: format!("{requester}@example.com"),
        target_id: target.into(),
        target_email: format!("{target}@example.com"),
        message: "We worked together at the newsroom.".into(),
    }
}

#[tokio::test]
async fn create_and_find_pending() {
    let repo = setup().await;

    let created = repo.create(request("newbie", "member")).await.unwrap();
    assert_eq!(created.status, EndorsementStatus::Pending);
    assert!(created.resolved_at.is_none());

    let pending = repo.find_pending("newbie", "member").await.unwrap().unwrap();
    assert_eq!(pending.id, created.id);

    assert!(repo.find_pending("member", "newbie").await.unwrap().is_none());
}

#[tokio::test]
async fn second_pending_request_for_pair_is_rejected() {
    let repo = setup().await;
    repo.create(request("newbie", "member")).await.unwrap();

    let err = repo.create(request("newbie", "member")).await.unwrap_err();
    assert!(matches!(err, PortalError::AlreadyExists { .. }), "{err:?}");

    // A different target is a different pair.
    repo.create(request("newbie", "other-member")).await.unwrap();
}

#[tokio::test]
async fn resolve_is_single_shot_and_frees_the_pair() {
    let repo = setup().await;
    let created = repo.create(request("newbie", "member")).await.unwrap();

    let declined = repo
        .resolve(created.id, EndorsementStatus::Declined)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(declined.status, EndorsementStatus::Declined);
    assert!(declined.resolved_at.is_some());

    let again = repo
        .resolve(created.id, EndorsementStatus::Accepted)
        .await
        .unwrap();
    assert!(again.is_none(), "resolved request must not change again");

    let stored = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(stored.status, EndorsementStatus::Declined);

    // The pair may ask again once the earlier request is resolved.
    repo.create(request("newbie", "member")).await.unwrap();
}

#[tokio::test]
async fn resolving_drops_the_pair_lock() {
    let db = setup_db().await;
    let repo = SurrealEndorsementRepository::new(db.clone());
    let created = repo.create(request("newbie", "member")).await.unwrap();
    repo.create(request("newbie", "other-member")).await.unwrap();
    assert_eq!(pair_locks(&db).await.len(), 2);

    repo.resolve(created.id, EndorsementStatus::Accepted)
        .await
        .unwrap()
        .unwrap();

    let locks = pair_locks(&db).await;
    assert_eq!(locks.len(), 1);
    assert!(!locks.contains(&created.id.to_string()));
}

#[tokio::test]
async fn concurrent_creates_for_one_pair_admit_one() {
    let repo = setup().await;

    let (a, b) = tokio::join!(
        repo.create(request("newbie", "member")),
        repo.create(request("newbie", "member")),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "{a:?} {b:?}");
    // The loser either sees the lock record or a commit conflict.
    let err = a.err().or(b.err()).unwrap();
    assert!(
        matches!(
            err,
            PortalError::AlreadyExists { .. } | PortalError::TransientStore(_)
        ),
        "{err:?}"
    );
    assert!(repo.find_pending("newbie", "member").await.unwrap().is_some());
}

#[tokio::test]
async fn list_by_target_and_requester() {
    let repo = setup().await;
    let first = repo.create(request("newbie-a", "member")).await.unwrap();
    repo.create(request("newbie-b", "member")).await.unwrap();
    repo.resolve(first.id, EndorsementStatus::Accepted)
        .await
        .unwrap();

    let all = repo
        .list_by_target("member", None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let pending = repo
        .list_by_target("member", Some(EndorsementStatus::Pending), Pagination::default())
        .await
        .unwrap();
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].requester_id, "newbie-b");

    let sent = repo
        .list_by_requester("newbie-a", Pagination::default())
        .await
        .unwrap();
    assert_eq!(sent.items.len(), 1);
    assert_eq!(sent.items[0].status, EndorsementStatus::Accepted);
}
