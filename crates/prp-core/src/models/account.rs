//! Account domain model.
//!
//! An account records the trust standing of one authenticated principal.
//! Its id is the principal id assigned by the identity provider.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrustState {
    PendingReview,
    Approved,
    Rejected,
}

impl TrustState {
    pub fn is_approved(self) -> bool {
        self == TrustState::Approved
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrustState::PendingReview => "pending_review",
            TrustState::Approved => "approved",
            TrustState::Rejected => "rejected",
        })
    }
}

/// What a caller sees when asking for its own standing.
///
/// `Unauthenticated` is distinct from `PendingReview`: it is reported when
/// there is no signed-in principal or the principal never signed up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    Unauthenticated,
    PendingReview,
    Approved,
    Rejected,
}

impl From<TrustState> for AccountStatus {
    fn from(state: TrustState) -> Self {
        match state {
            TrustState::PendingReview => AccountStatus::PendingReview,
            TrustState::Approved => AccountStatus::Approved,
            TrustState::Rejected => AccountStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Principal id from the identity provider.
    pub id: String,
    pub email: String,
    pub trust_state: TrustState,
    /// Number of endorsements this account gave that were accepted.
    pub reputation_score: u32,
    pub endorsements_given_this_period: u32,
    /// When the current endorsement period ends.
    pub period_reset_at: DateTime<Utc>,
    /// Lower-cased domain part of `email`.
    pub company_domain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub id: String,
    pub email: String,
    pub period_reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAccount {
    pub trust_state: Option<TrustState>,
    pub reputation_score: Option<u32>,
    pub endorsements_given_this_period: Option<u32>,
    pub period_reset_at: Option<DateTime<Utc>>,
}

/// Derive the company domain from an email address.
///
/// Returns an empty string when the address has no `@`.
pub fn email_domain(email: &str) -> String {
    email
        .trim()
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_lowercased() {
        assert_eq!(email_domain("Jane.Doe@Example.COM"), "example.com");
    }

    #[test]
    fn domain_of_address_without_at_is_empty() {
        assert_eq!(email_domain("not-an-email"), "");
    }

    #[test]
    fn trust_state_maps_to_status() {
        assert_eq!(
            AccountStatus::from(TrustState::PendingReview),
            AccountStatus::PendingReview
        );
        assert_ne!(
            AccountStatus::from(TrustState::PendingReview),
            AccountStatus::Unauthenticated
        );
    }
}
