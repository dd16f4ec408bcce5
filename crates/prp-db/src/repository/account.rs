//! SurrealDB implementation of [`AccountRepository`].

use chrono::{DateTime, Utc};
use prp_core::error::PortalResult;
use prp_core::models::account::{
    Account, CreateAccount, TrustState, UpdateAccount, email_domain,
};
use prp_core::repository::{AccountRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::CountRow;
use crate::error::DbError;

/// DB-side row struct for queries where the principal id is already known.
#[derive(Debug, SurrealValue)]
struct AccountRow {
    email: String,
    trust_state: String,
    reputation_score: u32,
    endorsements_given_this_period: u32,
    period_reset_at: DateTime<Utc>,
    company_domain: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    email: String,
    trust_state: String,
    reputation_score: u32,
    endorsements_given_this_period: u32,
    period_reset_at: DateTime<Utc>,
    company_domain: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_trust_state(s: &str) -> Result<TrustState, DbError> {
    match s {
        "PendingReview" => Ok(TrustState::PendingReview),
        "Approved" => Ok(TrustState::Approved),
        "Rejected" => Ok(TrustState::Rejected),
        other => Err(DbError::corrupt(
            "account",
            format!("unknown trust state: {other}"),
        )),
    }
}

pub(crate) fn trust_state_to_string(s: TrustState) -> &'static str {
    match s {
        TrustState::PendingReview => "PendingReview",
        TrustState::Approved => "Approved",
        TrustState::Rejected => "Rejected",
    }
}

impl AccountRow {
    fn into_account(self, id: String) -> Result<Account, DbError> {
        Ok(Account {
            id,
            email: self.email,
            trust_state: parse_trust_state(&self.trust_state)?,
            reputation_score: self.reputation_score,
            endorsements_given_this_period: self.endorsements_given_this_period,
            period_reset_at: self.period_reset_at,
            company_domain: self.company_domain,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AccountRowWithId {
    fn try_into_account(self) -> Result<Account, DbError> {
        Ok(Account {
            id: self.record_id,
            email: self.email,
            trust_state: parse_trust_state(&self.trust_state)?,
            reputation_score: self.reputation_score,
            endorsements_given_this_period: self.endorsements_given_this_period,
            period_reset_at: self.period_reset_at,
            company_domain: self.company_domain,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_account(rows: Vec<AccountRow>, id: &str) -> Result<Account, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: id.to_string(),
        })?
        .into_account(id.to_string())
}

/// SurrealDB implementation of the Account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> PortalResult<Account> {
        let email = input.email.trim().to_string();
        let email_key = email.to_lowercase();
        let company_domain = email_domain(&email);

        let result = self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 email = $email, \
                 email_key = $email_key, \
                 trust_state = $trust_state, \
                 reputation_score = 0, \
                 endorsements_given_this_period = 0, \
                 period_reset_at = $period_reset_at, \
                 company_domain = $company_domain",
            )
            .bind(("id", input.id.clone()))
            .bind(("email", email))
            .bind(("email_key", email_key))
            .bind((
                "trust_state",
                trust_state_to_string(TrustState::PendingReview).to_string(),
            ))
            .bind(("period_reset_at", input.period_reset_at))
            .bind(("company_domain", company_domain))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            if e.to_string().contains("idx_account_email") {
                DbError::Duplicate {
                    entity: "account email".into(),
                }
            } else {
                DbError::statement("account", e)
            }
        })?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_account(rows, &input.id)?)
    }

    async fn get_by_id(&self, id: &str) -> PortalResult<Account> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_account(rows, id)?)
    }

    async fn get_by_email(&self, email: &str) -> PortalResult<Account> {
        let normalized = email.trim().to_lowercase();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE email_key = $email",
            )
            .bind(("email", normalized))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_account()?)
    }

    async fn update(&self, id: &str, input: UpdateAccount) -> PortalResult<Account> {
        let mut sets = Vec::new();
        if input.trust_state.is_some() {
            sets.push("trust_state = $trust_state");
        }
        if input.reputation_score.is_some() {
            sets.push("reputation_score = $reputation_score");
        }
        if input.endorsements_given_this_period.is_some() {
            sets.push("endorsements_given_this_period = $endorsements_given");
        }
        if input.period_reset_at.is_some() {
            sets.push("period_reset_at = $period_reset_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('account', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(state) = input.trust_state {
            builder = builder.bind(("trust_state", trust_state_to_string(state).to_string()));
        }
        if let Some(score) = input.reputation_score {
            builder = builder.bind(("reputation_score", score));
        }
        if let Some(given) = input.endorsements_given_this_period {
            builder = builder.bind(("endorsements_given", given));
        }
        if let Some(reset_at) = input.period_reset_at {
            builder = builder.bind(("period_reset_at", reset_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("account", e))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_account(rows, id)?)
    }

    async fn record_endorsement(
        &self,
        id: &str,
        max_per_period: u32,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> PortalResult<Option<Account>> {
        // `period_reset_at` is assigned last so the counter expression still
        // sees the stored window.
        let result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 endorsements_given_this_period = (IF period_reset_at <= $now \
                     { 1 } ELSE { endorsements_given_this_period + 1 }), \
                 reputation_score += 1, \
                 updated_at = time::now(), \
                 period_reset_at = (IF period_reset_at <= $now \
                     { $next_reset_at } ELSE { period_reset_at }) \
                 WHERE $max > 0 AND (period_reset_at <= $now \
                     OR endorsements_given_this_period < $max)",
            )
            .bind(("id", id.to_string()))
            .bind(("max", max_per_period))
            .bind(("now", now))
            .bind(("next_reset_at", next_reset_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("account", e))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_account(id.to_string())?)),
            None => {
                // Distinguish a missing account from a full quota.
                self.get_by_id(id).await?;
                Ok(None)
            }
        }
    }

    async fn release_endorsement(&self, id: &str) -> PortalResult<Account> {
        let result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 endorsements_given_this_period -= 1, \
                 reputation_score -= 1, \
                 updated_at = time::now() \
                 WHERE endorsements_given_this_period > 0 AND reputation_score > 0",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("account", e))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_account(id.to_string())?),
            None => self.get_by_id(id).await,
        }
    }

    async fn list_by_trust_state(
        &self,
        state: TrustState,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<Account>> {
        let state_str = trust_state_to_string(state).to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM account \
                 WHERE trust_state = $trust_state GROUP ALL",
            )
            .bind(("trust_state", state_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE trust_state = $trust_state \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("trust_state", state_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AccountRowWithId::try_into_account)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
