//! Workflow error types.

use prp_core::error::PortalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("an account already exists for this principal")]
    DuplicateAccount,

    #[error("another account already uses this email")]
    EmailInUse,

    #[error("invite code not found")]
    CodeNotFound,

    #[error("invite code has expired")]
    CodeExpired,

    #[error("invite code has no uses left")]
    CodeExhausted,

    #[error("invite code is restricted to another email domain")]
    DomainMismatch,

    #[error("an account cannot endorse itself")]
    SelfEndorsement,

    #[error("endorser is not an approved member")]
    TargetNotApproved,

    #[error("a pending endorsement request to this member already exists")]
    DuplicatePendingRequest,

    #[error("caller is not allowed to perform this action")]
    NotAuthorized,

    #[error("endorsement request was already resolved")]
    AlreadyResolved,

    #[error("required field is empty: {field}")]
    IncompleteSubmission { field: &'static str },

    #[error("word limit exceeded: {count} words")]
    WordLimitExceeded { count: usize },

    #[error("max uses must be at least 1")]
    InvalidMaxUses,

    #[error("expiry must be in the future")]
    InvalidExpiry,

    #[error("endorsement quota for this period is used up")]
    QuotaExceeded,

    #[error("invalid trust transition: {0}")]
    InvalidTransition(String),

    #[error("search threshold must be within [0, 1]")]
    InvalidThreshold,

    #[error("at least one search field is required")]
    NoSearchFields,
}

impl From<WorkflowError> for PortalError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::DuplicateAccount => PortalError::AlreadyExists {
                entity: "account".into(),
            },
            WorkflowError::EmailInUse => PortalError::AlreadyExists {
                entity: "account email".into(),
            },
            WorkflowError::CodeNotFound => PortalError::NotFound {
                entity: "invite_code".into(),
                id: String::new(),
            },
            WorkflowError::CodeExpired
            | WorkflowError::CodeExhausted
            | WorkflowError::DomainMismatch
            | WorkflowError::DuplicatePendingRequest
            | WorkflowError::AlreadyResolved
            | WorkflowError::QuotaExceeded
            | WorkflowError::InvalidTransition(_) => PortalError::Conflict {
                reason: err.to_string(),
            },
            WorkflowError::TargetNotApproved | WorkflowError::NotAuthorized => {
                PortalError::AuthorizationDenied {
                    reason: err.to_string(),
                }
            }
            WorkflowError::SelfEndorsement
            | WorkflowError::IncompleteSubmission { .. }
            | WorkflowError::WordLimitExceeded { .. }
            | WorkflowError::InvalidMaxUses
            | WorkflowError::InvalidExpiry
            | WorkflowError::InvalidThreshold
            | WorkflowError::NoSearchFields => PortalError::Validation {
                message: err.to_string(),
            },
        }
    }
}
