//! Opening the portal store.
//!
//! [`PortalStore`] owns one SurrealDB client with the portal namespace and
//! database selected, and hands out the repositories built on it.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;

use crate::error::DbError;
use crate::repository::{
    SurrealAccountRepository, SurrealEndorsementRepository, SurrealInviteCodeRepository,
    SurrealPressReleaseRepository,
};
use crate::schema::run_migrations;

/// The `[database]` table of the server configuration.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Endpoint with scheme: `ws://host:port` for a server, `mem://` for an
    /// in-process store that lives as long as the client.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Not used for `mem://`.
    pub username: String,
    pub password: String,
    /// Apply pending migrations as part of [`PortalStore::open`].
    pub migrate_on_connect: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "prp".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
            migrate_on_connect: false,
        }
    }
}

impl DbConfig {
    fn is_embedded(&self) -> bool {
        self.url.starts_with("mem://")
    }
}

/// Connected store plus repository constructors.
#[derive(Clone)]
pub struct PortalStore {
    db: Surreal<Any>,
}

impl PortalStore {
    /// Connect, sign in when talking to a server, select the portal
    /// namespace and database, and migrate if configured to.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        tracing::info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "opening portal store"
        );

        let db = any::connect(config.url.as_str()).await?;

        if !config.is_embedded() {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        let store = Self { db };
        if config.migrate_on_connect {
            store.migrate().await?;
        }
        Ok(store)
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), DbError> {
        run_migrations(&self.db).await?;
        tracing::info!("portal schema up to date");
        Ok(())
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    pub fn accounts(&self) -> SurrealAccountRepository<Any> {
        SurrealAccountRepository::new(self.db.clone())
    }

    pub fn invites(&self) -> SurrealInviteCodeRepository<Any> {
        SurrealInviteCodeRepository::new(self.db.clone())
    }

    pub fn endorsements(&self) -> SurrealEndorsementRepository<Any> {
        SurrealEndorsementRepository::new(self.db.clone())
    }

    pub fn releases(&self) -> SurrealPressReleaseRepository<Any> {
        SurrealPressReleaseRepository::new(self.db.clone())
    }
}
