//! Endorsement requests between members.
//!
//! A pending or rejected account asks an approved member to vouch for it.
//! Accepting elevates the requester and counts against the endorser's
//! quota for the current period.

use prp_core::error::{PortalError, PortalResult};
use prp_core::models::account::Account;
use prp_core::models::endorsement::{
    CreateEndorsementRequest, EndorsementRequest, EndorsementStatus,
};
use prp_core::repository::{AccountRepository, EndorsementRepository, Pagination};
use uuid::Uuid;

use crate::account::AccountService;
use crate::config::PortalConfig;
use crate::error::WorkflowError;
use crate::retry::with_retry;

pub const DEFAULT_MESSAGE: &str =
    "I would like to request an endorsement for the Press Release Portal.";

/// How the requester names the member it asks.
#[derive(Debug, Clone)]
pub enum EndorsementTarget {
    Email(String),
    Id(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

pub struct EndorsementService<E: EndorsementRepository, A: AccountRepository> {
    requests: E,
    accounts: AccountService<A>,
    config: PortalConfig,
}

impl<E: EndorsementRepository, A: AccountRepository> EndorsementService<E, A> {
    pub fn new(requests: E, accounts: AccountService<A>, config: PortalConfig) -> Self {
        Self {
            requests,
            accounts,
            config,
        }
    }

    pub async fn create(
        &self,
        requester_id: &str,
        target: EndorsementTarget,
        message: &str,
    ) -> PortalResult<EndorsementRequest> {
        let requester = self.accounts.get(requester_id).await?;
        if requester.trust_state.is_approved() {
            return Err(PortalError::AuthorizationDenied {
                reason: "approved accounts do not need endorsement".into(),
            });
        }

        let is_self = match &target {
            EndorsementTarget::Id(id) => id.trim() == requester.id,
            EndorsementTarget::Email(email) => email.trim().eq_ignore_ascii_case(&requester.email),
        };
        if is_self {
            return Err(WorkflowError::SelfEndorsement.into());
        }

        let target = self.resolve_target(&target).await?;
        if target.id == requester.id {
            return Err(WorkflowError::SelfEndorsement.into());
        }
        if !target.trust_state.is_approved() {
            return Err(WorkflowError::TargetNotApproved.into());
        }
        if self
            .requests
            .find_pending(&requester.id, &target.id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::DuplicatePendingRequest.into());
        }

        let message = match message.trim() {
            "" => DEFAULT_MESSAGE.to_string(),
            m => m.to_string(),
        };
        let input = CreateEndorsementRequest {
            requester_id: requester.id,
            requester_email: requester.email,
            target_id: target.id,
            target_email: target.email,
            message,
        };
        // A lost commit race retries into the pair lock and reports a
        // duplicate.
        let request = with_retry(&self.config, "create_endorsement", || {
            self.requests.create(input.clone())
        })
        .await
        .map_err(|e| match e {
            PortalError::AlreadyExists { .. } => WorkflowError::DuplicatePendingRequest.into(),
            other => other,
        })?;

        tracing::info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            target_id = %request.target_id,
            "endorsement requested"
        );
        Ok(request)
    }

    /// Accept or decline a pending request. Only its target may do so.
    pub async fn resolve(
        &self,
        request_id: Uuid,
        caller_id: &str,
        decision: Decision,
    ) -> PortalResult<EndorsementRequest> {
        let request = self.requests.get_by_id(request_id).await?;
        if request.target_id != caller_id {
            return Err(WorkflowError::NotAuthorized.into());
        }
        if request.status != EndorsementStatus::Pending {
            return Err(WorkflowError::AlreadyResolved.into());
        }

        let resolved = match decision {
            Decision::Decline => {
                self.requests
                    .resolve(request_id, EndorsementStatus::Declined)
                    .await?
            }
            Decision::Accept => self.accept(&request).await?,
        };
        let Some(resolved) = resolved else {
            tracing::warn!(%request_id, "endorsement request resolved concurrently");
            return Err(WorkflowError::AlreadyResolved.into());
        };

        tracing::info!(
            %request_id,
            requester_id = %resolved.requester_id,
            target_id = %resolved.target_id,
            ?decision,
            "endorsement request resolved"
        );
        Ok(resolved)
    }

    /// Claim the endorser's quota slot and elevate the requester, then close
    /// the request. The request stays pending until both have succeeded, so
    /// a failed accept can be retried.
    async fn accept(
        &self,
        request: &EndorsementRequest,
    ) -> PortalResult<Option<EndorsementRequest>> {
        self.accounts
            .claim_endorsement_slot(&request.target_id)
            .await?;

        if let Err(e) = self
            .accounts
            .endorsement_accepted(&request.requester_id)
            .await
        {
            self.give_back_slot(request).await;
            return Err(e);
        }

        match self
            .requests
            .resolve(request.id, EndorsementStatus::Accepted)
            .await
        {
            Ok(Some(resolved)) => Ok(Some(resolved)),
            other => {
                self.give_back_slot(request).await;
                other
            }
        }
    }

    async fn give_back_slot(&self, request: &EndorsementRequest) {
        let released = with_retry(&self.config, "release_endorsement", || {
            self.accounts.release_endorsement_slot(&request.target_id)
        })
        .await;
        if let Err(e) = released {
            tracing::warn!(
                request_id = %request.id,
                endorser_id = %request.target_id,
                error = %e,
                "could not give back endorsement slot"
            );
        }
    }

    /// Pending requests addressed to `target_id`, newest first.
    pub async fn incoming(&self, target_id: &str) -> PortalResult<Vec<EndorsementRequest>> {
        let page = self
            .requests
            .list_by_target(
                target_id,
                Some(EndorsementStatus::Pending),
                Pagination::first(self.config.search_corpus_limit),
            )
            .await?;
        Ok(page.items)
    }

    /// Every request sent by `requester_id`, newest first.
    pub async fn outgoing(&self, requester_id: &str) -> PortalResult<Vec<EndorsementRequest>> {
        let page = self
            .requests
            .list_by_requester(
                requester_id,
                Pagination::first(self.config.search_corpus_limit),
            )
            .await?;
        Ok(page.items)
    }

    async fn resolve_target(&self, target: &EndorsementTarget) -> PortalResult<Account> {
        match target {
            EndorsementTarget::Id(id) => self.accounts.get(id.trim()).await,
            EndorsementTarget::Email(email) => self.accounts.get_by_email(email.trim()).await,
        }
    }
}
