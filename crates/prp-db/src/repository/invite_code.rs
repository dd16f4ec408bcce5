//! SurrealDB implementation of [`InviteCodeRepository`].
//!
//! The code itself is the record key, so a colliding insert fails on the
//! record id and surfaces as `AlreadyExists`.

use chrono::{DateTime, Utc};
use prp_core::error::PortalResult;
use prp_core::models::invite_code::{CreateInviteCode, InviteCode};
use prp_core::repository::{InviteCodeRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::CountRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct InviteCodeRow {
    issued_by: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    max_uses: u32,
    current_uses: u32,
    invitee_domain: Option<String>,
    active: bool,
}

#[derive(Debug, SurrealValue)]
struct InviteCodeRowWithId {
    record_id: String,
    issued_by: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    max_uses: u32,
    current_uses: u32,
    invitee_domain: Option<String>,
    active: bool,
}

impl InviteCodeRow {
    fn into_invite_code(self, code: String) -> InviteCode {
        InviteCode {
            code,
            issued_by: self.issued_by,
            created_at: self.created_at,
            expires_at: self.expires_at,
            max_uses: self.max_uses,
            current_uses: self.current_uses,
            invitee_domain: self.invitee_domain,
            active: self.active,
        }
    }
}

impl From<InviteCodeRowWithId> for InviteCode {
    fn from(row: InviteCodeRowWithId) -> Self {
        InviteCode {
            code: row.record_id,
            issued_by: row.issued_by,
            created_at: row.created_at,
            expires_at: row.expires_at,
            max_uses: row.max_uses,
            current_uses: row.current_uses,
            invitee_domain: row.invitee_domain,
            active: row.active,
        }
    }
}

fn first_code(rows: Vec<InviteCodeRow>, code: &str) -> Result<InviteCode, DbError> {
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "invite_code".into(),
        id: code.to_string(),
    })?;
    Ok(row.into_invite_code(code.to_string()))
}

/// SurrealDB implementation of the InviteCode repository.
#[derive(Clone)]
pub struct SurrealInviteCodeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInviteCodeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> InviteCodeRepository for SurrealInviteCodeRepository<C> {
    async fn create(&self, input: CreateInviteCode) -> PortalResult<InviteCode> {
        let result = self
            .db
            .query(
                "CREATE type::record('invite_code', $code) SET \
                 issued_by = $issued_by, \
                 expires_at = $expires_at, \
                 max_uses = $max_uses, \
                 current_uses = 0, \
                 invitee_domain = $invitee_domain, \
                 active = true",
            )
            .bind(("code", input.code.clone()))
            .bind(("issued_by", input.issued_by))
            .bind(("expires_at", input.expires_at))
            .bind(("max_uses", input.max_uses))
            .bind(("invitee_domain", input.invitee_domain))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("invite_code", e))?;

        let rows: Vec<InviteCodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_code(rows, &input.code)?)
    }

    async fn get_by_code(&self, code: &str) -> PortalResult<InviteCode> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('invite_code', $code)")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InviteCodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_code(rows, code)?)
    }

    async fn consume_use(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> PortalResult<Option<InviteCode>> {
        // `active` is assigned before the increment, so it sees the use
        // count as it was when the row matched.
        let result = self
            .db
            .query(
                "UPDATE type::record('invite_code', $code) \
                 SET active = current_uses + 1 < max_uses, \
                 current_uses += 1 \
                 WHERE active = true \
                 AND current_uses < max_uses \
                 AND (expires_at = NONE OR expires_at > $now)",
            )
            .bind(("code", code.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("invite_code", e))?;

        let rows: Vec<InviteCodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_invite_code(code.to_string())))
    }

    async fn release_use(&self, code: &str) -> PortalResult<InviteCode> {
        let result = self
            .db
            .query(
                "UPDATE type::record('invite_code', $code) \
                 SET current_uses -= 1, active = (revoked = false) \
                 WHERE current_uses > 0",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("invite_code", e))?;

        let rows: Vec<InviteCodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_code(rows, code)?)
    }

    async fn deactivate(&self, code: &str) -> PortalResult<InviteCode> {
        let result = self
            .db
            .query(
                "UPDATE type::record('invite_code', $code) \
                 SET active = false, revoked = true",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("invite_code", e))?;

        let rows: Vec<InviteCodeRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_code(rows, code)?)
    }

    async fn list_by_issuer(
        &self,
        issued_by: &str,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<InviteCode>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM invite_code \
                 WHERE issued_by = $issued_by GROUP ALL",
            )
            .bind(("issued_by", issued_by.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invite_code \
                 WHERE issued_by = $issued_by \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("issued_by", issued_by.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InviteCodeRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows.into_iter().map(InviteCode::from).collect(),
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
