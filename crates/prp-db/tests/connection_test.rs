//! Tests for opening the portal store through a `mem://` endpoint.

use chrono::{Duration, Utc};
use prp_core::models::account::{CreateAccount, TrustState};
use prp_core::repository::AccountRepository;
use prp_db::{DbConfig, PortalStore};

fn memory_config(migrate: bool) -> DbConfig {
    DbConfig {
        url: "mem://".into(),
        namespace: "test".into(),
        database: "test".into(),
        migrate_on_connect: migrate,
        ..DbConfig::default()
    }
}

async fn db_info(store: &PortalStore) -> String {
    let mut result = store.client().query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    format!("{info:?}")
}

#[tokio::test]
async fn open_with_migrations_yields_working_repositories() {
    let store = PortalStore::open(&memory_config(true)).await.unwrap();

    let accounts = store.accounts();
    accounts
        .create(CreateAccount {
            id: "uid-store".into(),
            email: "store@example.com".into(),
            period_reset_at: Utc::now() + Duration::days(30),
        })
        .await
        .unwrap();

    let fetched = accounts.get_by_id("uid-store").await.unwrap();
    assert_eq!(fetched.trust_state, TrustState::PendingReview);

    // Re-running is a no-op.
    store.migrate().await.unwrap();
}

#[tokio::test]
async fn open_without_migrations_leaves_schema_alone() {
    let store = PortalStore::open(&memory_config(false)).await.unwrap();

    assert!(!db_info(&store).await.contains("invite_code"));

    store.migrate().await.unwrap();
    assert!(db_info(&store).await.contains("invite_code"));
}
