//! SurrealDB implementation of [`PressReleaseRepository`].
//!
//! The author-supplied fields are stored as one flexible object so that
//! narrative keys such as `where` never appear as identifiers in SurrealQL.

use chrono::{DateTime, Utc};
use prp_core::error::PortalResult;
use prp_core::models::press_release::{
    CreatePressRelease, PressRelease, PressReleaseFields, ReleaseStatus,
};
use prp_core::repository::{PaginatedResult, Pagination, PressReleaseRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PressReleaseRow {
    owner_id: String,
    owner_email: String,
    status: String,
    fields: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct PressReleaseRowWithId {
    record_id: String,
    owner_id: String,
    owner_email: String,
    status: String,
    fields: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

fn parse_status(s: &str) -> Result<ReleaseStatus, DbError> {
    match s {
        "PendingModeration" => Ok(ReleaseStatus::PendingModeration),
        "Approved" => Ok(ReleaseStatus::Approved),
        "Rejected" => Ok(ReleaseStatus::Rejected),
        other => Err(DbError::corrupt(
            "press_release",
            format!("unknown status: {other}"),
        )),
    }
}

fn status_to_string(s: ReleaseStatus) -> &'static str {
    match s {
        ReleaseStatus::PendingModeration => "PendingModeration",
        ReleaseStatus::Approved => "Approved",
        ReleaseStatus::Rejected => "Rejected",
    }
}

fn parse_fields(value: serde_json::Value) -> Result<PressReleaseFields, DbError> {
    serde_json::from_value(value)
        .map_err(|e| DbError::corrupt("press_release", format!("invalid fields: {e}")))
}

fn fields_to_value(fields: &PressReleaseFields) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(fields)
        .map_err(|e| DbError::corrupt("press_release", format!("unserializable fields: {e}")))
}

impl PressReleaseRow {
    fn into_press_release(self, id: Uuid) -> Result<PressRelease, DbError> {
        Ok(PressRelease {
            id,
            owner_id: self.owner_id,
            owner_email: self.owner_email,
            status: parse_status(&self.status)?,
            fields: parse_fields(self.fields)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PressReleaseRowWithId {
    fn try_into_press_release(self) -> Result<PressRelease, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("press_release", format!("invalid UUID: {e}")))?;
        Ok(PressRelease {
            id,
            owner_id: self.owner_id,
            owner_email: self.owner_email,
            status: parse_status(&self.status)?,
            fields: parse_fields(self.fields)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_release(rows: Vec<PressReleaseRow>, id: Uuid) -> Result<PressRelease, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "press_release".into(),
            id: id.to_string(),
        })?
        .into_press_release(id)
}

/// SurrealDB implementation of the PressRelease repository.
#[derive(Clone)]
pub struct SurrealPressReleaseRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPressReleaseRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list_where(
        &self,
        filter: &str,
        name: &'static str,
        value: String,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<PressRelease>> {
        let count_query =
            format!("SELECT count() AS total FROM press_release WHERE {filter} GROUP ALL");
        let mut count_result = self
            .db
            .query(&count_query)
            .bind((name, value.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM press_release \
             WHERE {filter} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind((name, value))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PressReleaseRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(PressReleaseRowWithId::try_into_press_release)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> PressReleaseRepository for SurrealPressReleaseRepository<C> {
    async fn create(&self, input: CreatePressRelease) -> PortalResult<PressRelease> {
        let id = Uuid::new_v4();
        let fields = fields_to_value(&input.fields)?;

        let result = self
            .db
            .query(
                "CREATE type::record('press_release', $id) SET \
                 owner_id = $owner_id, \
                 owner_email = $owner_email, \
                 status = $status, \
                 fields = $fields",
            )
            .bind(("id", id.to_string()))
            .bind(("owner_id", input.owner_id))
            .bind(("owner_email", input.owner_email))
            .bind((
                "status",
                status_to_string(ReleaseStatus::PendingModeration).to_string(),
            ))
            .bind(("fields", fields))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("press_release", e))?;

        let rows: Vec<PressReleaseRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_release(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<PressRelease> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('press_release', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PressReleaseRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_release(rows, id)?)
    }

    async fn update_fields(
        &self,
        id: Uuid,
        fields: PressReleaseFields,
    ) -> PortalResult<PressRelease> {
        let fields = fields_to_value(&fields)?;

        let result = self
            .db
            .query(
                "UPDATE type::record('press_release', $id) SET \
                 fields = $fields, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("fields", fields))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("press_release", e))?;

        let rows: Vec<PressReleaseRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_release(rows, id)?)
    }

    async fn set_status(&self, id: Uuid, status: ReleaseStatus) -> PortalResult<PressRelease> {
        let result = self
            .db
            .query("UPDATE type::record('press_release', $id) SET status = $status")
            .bind(("id", id.to_string()))
            .bind(("status", status_to_string(status).to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("press_release", e))?;

        let rows: Vec<PressReleaseRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_release(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> PortalResult<()> {
        self.db
            .query("DELETE type::record('press_release', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement("press_release", e))?;

        Ok(())
    }

    async fn list_by_status(
        &self,
        status: ReleaseStatus,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<PressRelease>> {
        self.list_where(
            "status = $status",
            "status",
            status_to_string(status).to_string(),
            pagination,
        )
        .await
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<PressRelease>> {
        self.list_where(
            "owner_id = $owner_id",
            "owner_id",
            owner_id.to_string(),
            pagination,
        )
        .await
    }
}
