//! Shared fixtures for the workflow integration tests: an in-memory
//! SurrealDB with migrations applied, the four services wired to it, and
//! an in-process identity provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use prp_core::error::{PortalError, PortalResult};
use prp_core::identity::{IdentityProvider, Principal};
use prp_core::models::account::{Account, CreateAccount, TrustState, UpdateAccount};
use prp_core::models::press_release::PressReleaseFields;
use prp_core::repository::{AccountRepository, PaginatedResult, Pagination};
use prp_db::repository::{
    SurrealAccountRepository, SurrealEndorsementRepository, SurrealInviteCodeRepository,
    SurrealPressReleaseRepository,
};
use prp_portal::{
    AccountService, EndorsementService, InviteService, PortalConfig, PressReleaseService,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

pub type Accounts = SurrealAccountRepository<Db>;

pub struct Portal<A: AccountRepository + Clone = Accounts> {
    pub db: Surreal<Db>,
    pub accounts: AccountService<A>,
    pub invites: InviteService<SurrealInviteCodeRepository<Db>, A>,
    pub endorsements: EndorsementService<SurrealEndorsementRepository<Db>, A>,
    pub releases: PressReleaseService<SurrealPressReleaseRepository<Db>, A>,
}

pub async fn portal() -> Portal {
    portal_with(PortalConfig::default()).await
}

pub async fn portal_with(config: PortalConfig) -> Portal {
    let db = memory_db().await;
    wire(db.clone(), SurrealAccountRepository::new(db), config)
}

/// A portal whose account store misbehaves on demand through the returned
/// [`Faults`].
pub async fn faulty_portal(config: PortalConfig) -> (Portal<FaultyAccounts>, Arc<Faults>) {
    let db = memory_db().await;
    let faults = Arc::new(Faults::default());
    let repo = FaultyAccounts {
        inner: SurrealAccountRepository::new(db.clone()),
        faults: faults.clone(),
    };
    (wire(db, repo, config), faults)
}

async fn memory_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    prp_db::run_migrations(&db).await.unwrap();
    db
}

fn wire<A: AccountRepository + Clone>(db: Surreal<Db>, repo: A, config: PortalConfig) -> Portal<A> {
    let accounts = AccountService::new(repo, config.clone());
    Portal {
        invites: InviteService::new(
            SurrealInviteCodeRepository::new(db.clone()),
            accounts.clone(),
            config.clone(),
        ),
        endorsements: EndorsementService::new(
            SurrealEndorsementRepository::new(db.clone()),
            accounts.clone(),
            config.clone(),
        ),
        releases: PressReleaseService::new(
            SurrealPressReleaseRepository::new(db.clone()),
            accounts.clone(),
            config,
        ),
        accounts,
        db,
    }
}

pub fn principal(id: &str, email: &str) -> Principal {
    Principal {
        id: id.into(),
        email: email.into(),
    }
}

/// Sign up a principal, leaving the account pending review.
pub async fn pending<A: AccountRepository + Clone>(
    portal: &Portal<A>,
    id: &str,
    email: &str,
) -> Account {
    portal.accounts.signup(&principal(id, email)).await.unwrap()
}

/// Sign up a principal and have a moderator approve it.
pub async fn approved<A: AccountRepository + Clone>(
    portal: &Portal<A>,
    id: &str,
    email: &str,
) -> Account {
    pending(portal, id, email).await;
    portal.accounts.moderator_approve(id).await.unwrap().account
}

pub fn release_fields(headline: &str, location: &str) -> PressReleaseFields {
    PressReleaseFields {
        headline: headline.into(),
        location: location.into(),
        date: "2025-04-12".into(),
        what: "Community event".into(),
        who: "Residents".into(),
        when: "Saturday".into(),
        r#where: "Town square".into(),
        why: "Celebration".into(),
        how: "Open invitation".into(),
        website: "https://events.example".into(),
    }
}

/// Identity provider kept in process memory.
#[derive(Default)]
pub struct FakeIdentity {
    users: Mutex<HashMap<String, (String, Principal)>>,
    current: Mutex<Option<Principal>>,
}

impl IdentityProvider for FakeIdentity {
    async fn current_principal(&self) -> Option<Principal> {
        self.current.lock().unwrap().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortalResult<Principal> {
        let users = self.users.lock().unwrap();
        match users.get(&email.to_lowercase()) {
            Some((stored, principal)) if stored == password => {
                *self.current.lock().unwrap() = Some(principal.clone());
                Ok(principal.clone())
            }
            _ => Err(PortalError::AuthenticationFailed {
                reason: "auth/invalid-credential".into(),
            }),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortalResult<Principal> {
        let mut users = self.users.lock().unwrap();
        let key = email.to_lowercase();
        if users.contains_key(&key) {
            return Err(PortalError::AuthenticationFailed {
                reason: "auth/email-already-in-use".into(),
            });
        }
        let principal = principal(&format!("uid-{}", users.len() + 1), email);
        users.insert(key, (password.into(), principal.clone()));
        *self.current.lock().unwrap() = Some(principal.clone());
        Ok(principal)
    }

    async fn sign_out(&self) -> PortalResult<()> {
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

/// Switches for [`FaultyAccounts`].
#[derive(Default)]
pub struct Faults {
    /// Trust-state writes to this account fail as a store timeout.
    pub fail_state_write: Mutex<Option<String>>,
    /// Returned once by `get_by_id` in place of the stored record.
    pub stale_read: Mutex<Option<Account>>,
}

/// Account store that injects the failures named in [`Faults`].
#[derive(Clone)]
pub struct FaultyAccounts {
    inner: Accounts,
    faults: Arc<Faults>,
}

impl AccountRepository for FaultyAccounts {
    async fn create(&self, input: CreateAccount) -> PortalResult<Account> {
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: &str) -> PortalResult<Account> {
        let stale = {
            let mut stale = self.faults.stale_read.lock().unwrap();
            match stale.as_ref() {
                Some(account) if account.id == id => stale.take(),
                _ => None,
            }
        };
        match stale {
            Some(account) => Ok(account),
            None => self.inner.get_by_id(id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> PortalResult<Account> {
        self.inner.get_by_email(email).await
    }

    async fn update(&self, id: &str, input: UpdateAccount) -> PortalResult<Account> {
        let failing = self.faults.fail_state_write.lock().unwrap().as_deref() == Some(id);
        if failing && input.trust_state.is_some() {
            return Err(PortalError::TransientStore("timeout".into()));
        }
        self.inner.update(id, input).await
    }

    async fn record_endorsement(
        &self,
        id: &str,
        max_per_period: u32,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> PortalResult<Option<Account>> {
        self.inner
            .record_endorsement(id, max_per_period, now, next_reset_at)
            .await
    }

    async fn release_endorsement(&self, id: &str) -> PortalResult<Account> {
        self.inner.release_endorsement(id).await
    }

    async fn list_by_trust_state(
        &self,
        state: TrustState,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<Account>> {
        self.inner.list_by_trust_state(state, pagination).await
    }
}
