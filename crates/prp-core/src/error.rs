//! Error types for the press release portal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Transient store error: {0}")]
    TransientStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    Conflict,
    NotFound,
    TransientStore,
    Internal,
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::NotFound { .. } => ErrorKind::NotFound,
            PortalError::AlreadyExists { .. } | PortalError::Conflict { .. } => {
                ErrorKind::Conflict
            }
            PortalError::AuthenticationFailed { .. } => ErrorKind::Authentication,
            PortalError::AuthorizationDenied { .. } => ErrorKind::Authorization,
            PortalError::Validation { .. } => ErrorKind::Validation,
            PortalError::TransientStore(_) => ErrorKind::TransientStore,
            PortalError::Database(_) | PortalError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only store timeouts and transaction conflicts may be retried
    /// automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortalError::TransientStore(_))
    }

    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        PortalError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_variants_share_a_kind() {
        let exists = PortalError::AlreadyExists {
            entity: "account".into(),
        };
        let conflict = PortalError::Conflict {
            reason: "invite code exhausted".into(),
        };
        assert_eq!(exists.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(PortalError::TransientStore("timeout".into()).is_retryable());
        assert!(!PortalError::Database("syntax".into()).is_retryable());
        assert!(
            !PortalError::Validation {
                message: "empty headline".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = PortalError::not_found("press_release", "abc");
        assert_eq!(
            err.to_string(),
            "Entity not found: press_release with id abc"
        );
    }
}
