//! SurrealDB implementation of [`EndorsementRepository`].
//!
//! Pending uniqueness per (requester, target) pair is enforced by a
//! `pending_endorsement` record keyed by the pair. It is created in the
//! same transaction as the request, so a second pending insert fails on
//! the record id even when two creates race past the service pre-check.

use chrono::{DateTime, Utc};
use prp_core::error::PortalResult;
use prp_core::models::endorsement::{
    CreateEndorsementRequest, EndorsementRequest, EndorsementStatus,
};
use prp_core::repository::{EndorsementRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct EndorsementRow {
    requester_id: String,
    requester_email: String,
    target_id: String,
    target_email: String,
    status: String,
    message: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct EndorsementRowWithId {
    record_id: String,
    requester_id: String,
    requester_email: String,
    target_id: String,
    target_email: String,
    status: String,
    message: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

fn parse_status(s: &str) -> Result<EndorsementStatus, DbError> {
    match s {
        "Pending" => Ok(EndorsementStatus::Pending),
        "Accepted" => Ok(EndorsementStatus::Accepted),
        "Declined" => Ok(EndorsementStatus::Declined),
        other => Err(DbError::corrupt(
            "endorsement_request",
            format!("unknown status: {other}"),
        )),
    }
}

fn status_to_string(s: EndorsementStatus) -> &'static str {
    match s {
        EndorsementStatus::Pending => "Pending",
        EndorsementStatus::Accepted => "Accepted",
        EndorsementStatus::Declined => "Declined",
    }
}

/// Record key of the pending lock for a pair.
fn pair_key(requester_id: &str, target_id: &str) -> String {
    format!("{requester_id}|{target_id}")
}

impl EndorsementRow {
    fn into_request(self, id: Uuid) -> Result<EndorsementRequest, DbError> {
        Ok(EndorsementRequest {
            id,
            requester_id: self.requester_id,
            requester_email: self.requester_email,
            target_id: self.target_id,
            target_email: self.target_email,
            status: parse_status(&self.status)?,
            message: self.message,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

impl EndorsementRowWithId {
    fn try_into_request(self) -> Result<EndorsementRequest, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("endorsement_request", format!("invalid UUID: {e}")))?;
        Ok(EndorsementRequest {
            id,
            requester_id: self.requester_id,
            requester_email: self.requester_email,
            target_id: self.target_id,
            target_email: self.target_email,
            status: parse_status(&self.status)?,
            message: self.message,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

/// SurrealDB implementation of the EndorsementRequest repository.
#[derive(Clone)]
pub struct SurrealEndorsementRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEndorsementRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list_where(
        &self,
        filter: &str,
        bindings: Vec<(&'static str, String)>,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<EndorsementRequest>> {
        let count_query =
            format!("SELECT count() AS total FROM endorsement_request WHERE {filter} GROUP ALL");
        let mut count_builder = self.db.query(&count_query);
        for (name, value) in bindings.iter().cloned() {
            count_builder = count_builder.bind((name, value));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM endorsement_request \
             WHERE {filter} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );
        let mut builder = self.db.query(&query);
        for (name, value) in bindings {
            builder = builder.bind((name, value));
        }
        let mut result = builder
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EndorsementRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(EndorsementRowWithId::try_into_request)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> EndorsementRepository for SurrealEndorsementRepository<C> {
    async fn create(&self, input: CreateEndorsementRequest) -> PortalResult<EndorsementRequest> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('pending_endorsement', $pair) SET \
                 request_id = $id; \
                 CREATE type::record('endorsement_request', $id) SET \
                 requester_id = $requester_id, \
                 requester_email = $requester_email, \
                 target_id = $target_id, \
                 target_email = $target_email, \
                 status = $status, \
                 message = $message; \
                 COMMIT TRANSACTION;",
            )
            .bind(("pair", pair_key(&input.requester_id, &input.target_id)))
            .bind(("id", id_str))
            .bind(("requester_id", input.requester_id))
            .bind(("requester_email", input.requester_email))
            .bind(("target_id", input.target_id))
            .bind(("target_email", input.target_email))
            .bind((
                "status",
                status_to_string(EndorsementStatus::Pending).to_string(),
            ))
            .bind(("message", input.message))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement("endorsement_request", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<EndorsementRequest> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('endorsement_request', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EndorsementRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "endorsement_request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn find_pending(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> PortalResult<Option<EndorsementRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM endorsement_request \
                 WHERE requester_id = $requester_id \
                 AND target_id = $target_id \
                 AND status = 'Pending' \
                 LIMIT 1",
            )
            .bind(("requester_id", requester_id.to_string()))
            .bind(("target_id", target_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EndorsementRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(EndorsementRowWithId::try_into_request)
            .transpose()?)
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: EndorsementStatus,
    ) -> PortalResult<Option<EndorsementRequest>> {
        let id_str = id.to_string();

        // Only a still-pending request matches, so two concurrent resolvers
        // cannot both win. The `release_pair_lock` event drops the pair lock
        // inside this same statement.
        let result = self
            .db
            .query(
                "UPDATE type::record('endorsement_request', $id) \
                 SET status = $status, resolved_at = time::now() \
                 WHERE status = 'Pending'",
            )
            .bind(("id", id_str))
            .bind(("status", status_to_string(status).to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("endorsement_request", e))?;

        let rows: Vec<EndorsementRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_request(id))
            .transpose()?)
    }

    async fn list_by_target(
        &self,
        target_id: &str,
        status: Option<EndorsementStatus>,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<EndorsementRequest>> {
        let mut bindings = vec![("target_id", target_id.to_string())];
        let filter = match status {
            Some(status) => {
                bindings.push(("status", status_to_string(status).to_string()));
                "target_id = $target_id AND status = $status"
            }
            None => "target_id = $target_id",
        };
        self.list_where(filter, bindings, pagination).await
    }

    async fn list_by_requester(
        &self,
        requester_id: &str,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<EndorsementRequest>> {
        self.list_where(
            "requester_id = $requester_id",
            vec![("requester_id", requester_id.to_string())],
            pagination,
        )
        .await
    }
}
