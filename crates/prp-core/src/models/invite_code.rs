//! Invite code domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteCode {
    /// Human-typeable code, e.g. `PRP-7KQ2ZD`. Unique.
    pub code: String,
    /// Principal id of the issuer.
    pub issued_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: u32,
    pub current_uses: u32,
    /// Only principals whose email domain matches may redeem.
    pub invitee_domain: Option<String>,
    pub active: bool,
}

impl InviteCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_uses >= self.max_uses
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.current_uses)
    }

    /// Whether a redeemer from `domain` satisfies the domain restriction.
    pub fn accepts_domain(&self, domain: &str) -> bool {
        match &self.invitee_domain {
            Some(restricted) => restricted.eq_ignore_ascii_case(domain),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInviteCode {
    pub code: String,
    pub issued_by: String,
    pub max_uses: u32,
    pub invitee_domain: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
