//! Endorsement request domain model.
//!
//! A pending account asks an approved member to vouch for it. Accepting
//! the request elevates the requester.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EndorsementStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndorsementRequest {
    pub id: Uuid,
    pub requester_id: String,
    pub requester_email: String,
    pub target_id: String,
    pub target_email: String,
    pub status: EndorsementStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEndorsementRequest {
    pub requester_id: String,
    pub requester_email: String,
    pub target_id: String,
    pub target_email: String,
    pub message: String,
}
