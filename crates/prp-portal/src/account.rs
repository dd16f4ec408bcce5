//! Account trust state machine.
//!
//! `PendingReview` is the initial state. Moderators move accounts to
//! `Approved` or `Rejected`; an accepted endorsement or a redeemed invite
//! elevates any non-approved account to `Approved`. Elevation is idempotent
//! once approved.

use chrono::{Duration, Utc};
use prp_core::error::{PortalError, PortalResult};
use prp_core::identity::{IdentityProvider, Principal};
use prp_core::models::account::{
    Account, AccountStatus, CreateAccount, TrustState, UpdateAccount,
};
use prp_core::repository::{AccountRepository, Pagination, PaginatedResult};

use crate::config::PortalConfig;
use crate::error::WorkflowError;
use crate::retry::with_retry;

/// Something that may move an account between trust states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustEvent {
    ModeratorApprove,
    ModeratorReject,
    EndorsementAccepted,
    InviteRedeemed,
    /// A rejected account asks to be reviewed again.
    Reapply,
}

impl TrustEvent {
    /// Pure transition function.
    pub fn apply(self, from: TrustState) -> Result<Transition, WorkflowError> {
        let to = match (self, from) {
            (TrustEvent::ModeratorApprove, _)
            | (TrustEvent::EndorsementAccepted, _)
            | (TrustEvent::InviteRedeemed, _) => TrustState::Approved,
            (TrustEvent::ModeratorReject, _) => TrustState::Rejected,
            (TrustEvent::Reapply, TrustState::Approved) => {
                return Err(WorkflowError::InvalidTransition(
                    "an approved account cannot re-enter review".into(),
                ));
            }
            (TrustEvent::Reapply, _) => TrustState::PendingReview,
        };
        Ok(if to == from {
            Transition::Unchanged(from)
        } else {
            Transition::Changed { from, to }
        })
    }

    fn trigger(self) -> &'static str {
        match self {
            TrustEvent::ModeratorApprove => "moderator_approve",
            TrustEvent::ModeratorReject => "moderator_reject",
            TrustEvent::EndorsementAccepted => "endorsement_accepted",
            TrustEvent::InviteRedeemed => "invite_redeemed",
            TrustEvent::Reapply => "reapply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed { from: TrustState, to: TrustState },
    /// The event left the account where it was. Nothing is written.
    Unchanged(TrustState),
}

impl Transition {
    /// State after the event.
    pub fn state(self) -> TrustState {
        match self {
            Transition::Changed { to, .. } => to,
            Transition::Unchanged(state) => state,
        }
    }

    pub fn is_changed(self) -> bool {
        matches!(self, Transition::Changed { .. })
    }
}

/// Result of applying a [`TrustEvent`] to a stored account.
#[derive(Debug, Clone)]
pub struct AccountTransition {
    pub account: Account,
    pub transition: Transition,
}

/// Account lifecycle service.
///
/// Generic over the repository so the workflows have no dependency on the
/// database crate.
#[derive(Clone)]
pub struct AccountService<A: AccountRepository> {
    repo: A,
    config: PortalConfig,
}

impl<A: AccountRepository> AccountService<A> {
    pub fn new(repo: A, config: PortalConfig) -> Self {
        Self { repo, config }
    }

    /// Create the account record for a freshly signed-up principal.
    pub async fn signup(&self, principal: &Principal) -> PortalResult<Account> {
        let account = self
            .repo
            .create(CreateAccount {
                id: principal.id.clone(),
                email: principal.email.clone(),
                period_reset_at: Utc::now() + self.endorsement_period(),
            })
            .await
            .map_err(|e| match e {
                PortalError::AlreadyExists { entity } if entity == "account" => {
                    WorkflowError::DuplicateAccount.into()
                }
                PortalError::AlreadyExists { entity } if entity == "account email" => {
                    WorkflowError::EmailInUse.into()
                }
                other => other,
            })?;

        tracing::info!(
            account_id = %account.id,
            domain = %account.company_domain,
            "account created, pending review"
        );
        Ok(account)
    }

    /// Sign up with the identity provider, then create the account record.
    pub async fn register<P: IdentityProvider>(
        &self,
        identity: &P,
        email: &str,
        password: &str,
    ) -> PortalResult<Account> {
        let principal = identity.sign_up(email, password).await?;
        self.signup(&principal).await
    }

    pub async fn get(&self, account_id: &str) -> PortalResult<Account> {
        self.repo.get_by_id(account_id).await
    }

    pub async fn get_by_email(&self, email: &str) -> PortalResult<Account> {
        self.repo.get_by_email(email).await
    }

    pub async fn moderator_approve(&self, account_id: &str) -> PortalResult<AccountTransition> {
        self.apply(account_id, TrustEvent::ModeratorApprove).await
    }

    pub async fn moderator_reject(&self, account_id: &str) -> PortalResult<AccountTransition> {
        self.apply(account_id, TrustEvent::ModeratorReject).await
    }

    pub async fn endorsement_accepted(
        &self,
        requester_id: &str,
    ) -> PortalResult<AccountTransition> {
        self.apply(requester_id, TrustEvent::EndorsementAccepted)
            .await
    }

    pub async fn invite_redeemed(&self, principal_id: &str) -> PortalResult<AccountTransition> {
        self.apply(principal_id, TrustEvent::InviteRedeemed).await
    }

    pub async fn reapply(&self, account_id: &str) -> PortalResult<AccountTransition> {
        self.apply(account_id, TrustEvent::Reapply).await
    }

    /// Apply `event` and persist the new state when it changed.
    pub async fn apply(
        &self,
        account_id: &str,
        event: TrustEvent,
    ) -> PortalResult<AccountTransition> {
        let account = self.repo.get_by_id(account_id).await?;
        let transition = event.apply(account.trust_state)?;

        let Transition::Changed { from, to } = transition else {
            return Ok(AccountTransition {
                account,
                transition,
            });
        };

        let account = self
            .repo
            .update(
                account_id,
                UpdateAccount {
                    trust_state: Some(to),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            account_id = %account.id,
            %from,
            %to,
            trigger = event.trigger(),
            "trust state changed"
        );
        Ok(AccountTransition {
            account,
            transition,
        })
    }

    /// Standing of a principal.
    ///
    /// No principal, or a principal that never created an account, is
    /// `Unauthenticated`.
    pub async fn status_of(&self, principal: Option<&Principal>) -> PortalResult<AccountStatus> {
        let Some(principal) = principal else {
            return Ok(AccountStatus::Unauthenticated);
        };
        match self.repo.get_by_id(&principal.id).await {
            Ok(account) => Ok(account.trust_state.into()),
            Err(PortalError::NotFound { .. }) => Ok(AccountStatus::Unauthenticated),
            Err(e) => Err(e),
        }
    }

    /// Standing of whoever is currently signed in with `identity`.
    pub async fn current_status<P: IdentityProvider>(
        &self,
        identity: &P,
    ) -> PortalResult<AccountStatus> {
        let principal = identity.current_principal().await;
        self.status_of(principal.as_ref()).await
    }

    /// The account, provided it is approved.
    pub async fn require_approved(&self, account_id: &str) -> PortalResult<Account> {
        let account = self.repo.get_by_id(account_id).await?;
        if !account.trust_state.is_approved() {
            return Err(PortalError::AuthorizationDenied {
                reason: format!("account {account_id} is not approved"),
            });
        }
        Ok(account)
    }

    /// Accounts awaiting a moderator, oldest first.
    pub async fn review_queue(
        &self,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<Account>> {
        self.repo
            .list_by_trust_state(TrustState::PendingReview, pagination)
            .await
    }

    /// Count one accepted endorsement against `endorser_id` and raise its
    /// reputation, rolling the period over when it has elapsed.
    ///
    /// Fails with `QuotaExceeded`, writing nothing, when the period's quota
    /// is already used up.
    pub(crate) async fn claim_endorsement_slot(&self, endorser_id: &str) -> PortalResult<Account> {
        let now = Utc::now();
        let next_reset_at = now + self.endorsement_period();
        let claimed = with_retry(&self.config, "record_endorsement", || {
            self.repo.record_endorsement(
                endorser_id,
                self.config.max_endorsements_per_period,
                now,
                next_reset_at,
            )
        })
        .await?;
        let Some(account) = claimed else {
            return Err(WorkflowError::QuotaExceeded.into());
        };
        tracing::info!(
            account_id = %account.id,
            given = account.endorsements_given_this_period,
            reputation = account.reputation_score,
            "endorsement counted"
        );
        Ok(account)
    }

    /// Give back a slot taken by [`claim_endorsement_slot`](Self::claim_endorsement_slot).
    pub(crate) async fn release_endorsement_slot(&self, endorser_id: &str) -> PortalResult<Account> {
        let account = self.repo.release_endorsement(endorser_id).await?;
        tracing::info!(
            account_id = %account.id,
            given = account.endorsements_given_this_period,
            "endorsement slot released"
        );
        Ok(account)
    }

    fn endorsement_period(&self) -> Duration {
        Duration::days(self.config.endorsement_period_days)
    }
}
