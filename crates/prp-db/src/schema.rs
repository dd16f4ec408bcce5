//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. Principal ids and invite
//! codes are used directly as record keys; other ids are UUID strings.
//! Enums are stored as strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Accounts (keyed by principal id)
-- =======================================================================
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD email ON TABLE account TYPE string;
-- Lower-cased email; uniqueness and lookups go through this field.
DEFINE FIELD email_key ON TABLE account TYPE string;
DEFINE FIELD trust_state ON TABLE account TYPE string \
    ASSERT $value IN ['PendingReview', 'Approved', 'Rejected'];
DEFINE FIELD reputation_score ON TABLE account TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD endorsements_given_this_period ON TABLE account TYPE int \
    DEFAULT 0 ASSERT $value >= 0;
DEFINE FIELD period_reset_at ON TABLE account TYPE datetime;
DEFINE FIELD company_domain ON TABLE account TYPE string;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_email ON TABLE account COLUMNS email_key UNIQUE;
DEFINE INDEX idx_account_trust_state ON TABLE account \
    COLUMNS trust_state, created_at;

-- =======================================================================
-- Invite codes (keyed by code)
-- =======================================================================
DEFINE TABLE invite_code SCHEMAFULL;
DEFINE FIELD issued_by ON TABLE invite_code TYPE string;
DEFINE FIELD expires_at ON TABLE invite_code TYPE option<datetime>;
DEFINE FIELD max_uses ON TABLE invite_code TYPE int ASSERT $value >= 1;
DEFINE FIELD current_uses ON TABLE invite_code TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD invitee_domain ON TABLE invite_code TYPE option<string>;
DEFINE FIELD active ON TABLE invite_code TYPE bool DEFAULT true;
-- Set by the issuer. A revoked code never becomes active again.
DEFINE FIELD revoked ON TABLE invite_code TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE invite_code TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invite_code_issuer ON TABLE invite_code \
    COLUMNS issued_by, created_at;

-- =======================================================================
-- Endorsement requests
-- =======================================================================
DEFINE TABLE endorsement_request SCHEMAFULL;
DEFINE FIELD requester_id ON TABLE endorsement_request TYPE string;
DEFINE FIELD requester_email ON TABLE endorsement_request TYPE string;
DEFINE FIELD target_id ON TABLE endorsement_request TYPE string;
DEFINE FIELD target_email ON TABLE endorsement_request TYPE string;
DEFINE FIELD status ON TABLE endorsement_request TYPE string \
    ASSERT $value IN ['Pending', 'Accepted', 'Declined'];
DEFINE FIELD message ON TABLE endorsement_request TYPE string;
DEFINE FIELD created_at ON TABLE endorsement_request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD resolved_at ON TABLE endorsement_request \
    TYPE option<datetime>;
DEFINE INDEX idx_endorsement_pair ON TABLE endorsement_request \
    COLUMNS requester_id, target_id, status;
DEFINE INDEX idx_endorsement_target ON TABLE endorsement_request \
    COLUMNS target_id, status;

-- One record per (requester, target) pair with a pending request.
-- Created in the same transaction as the request. The event drops it in
-- the same statement that moves the request out of Pending.
DEFINE TABLE pending_endorsement SCHEMAFULL;
DEFINE FIELD request_id ON TABLE pending_endorsement TYPE string;
DEFINE EVENT release_pair_lock ON TABLE endorsement_request \
    WHEN $before.status = 'Pending' AND $after.status != 'Pending' \
    THEN (DELETE pending_endorsement WHERE request_id = meta::id($after.id));

-- =======================================================================
-- Press releases
-- =======================================================================
DEFINE TABLE press_release SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE press_release TYPE string;
DEFINE FIELD owner_email ON TABLE press_release TYPE string;
DEFINE FIELD status ON TABLE press_release TYPE string \
    ASSERT $value IN ['PendingModeration', 'Approved', 'Rejected'];
DEFINE FIELD fields ON TABLE press_release TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE press_release TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE press_release TYPE option<datetime>;
DEFINE INDEX idx_press_release_status ON TABLE press_release \
    COLUMNS status, created_at;
DEFINE INDEX idx_press_release_owner ON TABLE press_release \
    COLUMNS owner_id, created_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(version = migration.version, "Migration applied");
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "account",
            "invite_code",
            "endorsement_request",
            "pending_endorsement",
            "press_release",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
