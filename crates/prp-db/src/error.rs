//! Database-specific error types and conversions.

use prp_core::error::PortalError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    Duplicate { entity: String },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row in {entity}: {reason}")]
    Corrupt { entity: String, reason: String },
}

impl DbError {
    /// Classify a failed statement on `entity`.
    ///
    /// Unique-key violations become [`DbError::Duplicate`]; write conflicts,
    /// timeouts and lost connections become [`DbError::Transient`].
    pub(crate) fn statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if is_duplicate(&message) {
            DbError::Duplicate {
                entity: entity.into(),
            }
        } else if is_transient(&message) {
            DbError::Transient(message)
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn corrupt(entity: &str, reason: impl Into<String>) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

fn is_duplicate(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already exists") || lower.contains("already contains")
}

fn is_transient(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["conflict", "timed out", "timeout", "connection", "can be retried"]
        .iter()
        .any(|needle| lower.contains(needle))
}

impl From<DbError> for PortalError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PortalError::NotFound { entity, id },
            DbError::Duplicate { entity } => PortalError::AlreadyExists { entity },
            DbError::Transient(msg) => PortalError::TransientStore(msg),
            DbError::Surreal(e) => {
                let message = e.to_string();
                if is_transient(&message) {
                    PortalError::TransientStore(message)
                } else {
                    PortalError::Database(message)
                }
            }
            other => PortalError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_maps_to_already_exists() {
        let err: PortalError = DbError::Duplicate {
            entity: "account".into(),
        }
        .into();
        assert!(matches!(err, PortalError::AlreadyExists { entity } if entity == "account"));
    }

    #[test]
    fn transient_maps_to_retryable() {
        let err: PortalError = DbError::Transient("transaction conflict".into()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn message_classification() {
        assert!(is_duplicate(
            "Database record `account:abc` already exists"
        ));
        assert!(is_duplicate(
            "Database index `idx_account_email` already contains 'a@b.c'"
        ));
        assert!(is_transient("Transaction conflict: resource busy"));
        assert!(!is_transient("Parse error: unexpected token"));
    }
}
