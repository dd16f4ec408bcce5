//! Invite code issuance and redemption.
//!
//! Redeeming a code takes one use through a conditional store update, so
//! concurrent redeemers can never push `current_uses` past `max_uses`.

use chrono::{DateTime, Utc};
use prp_core::error::{PortalError, PortalResult};
use prp_core::models::account::Account;
use prp_core::models::invite_code::{CreateInviteCode, InviteCode};
use prp_core::repository::{AccountRepository, InviteCodeRepository, Pagination};
use rand::Rng;

use crate::account::{AccountService, Transition};
use crate::config::PortalConfig;
use crate::error::WorkflowError;
use crate::retry::with_retry;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate `"{prefix}-{length random chars from A-Z0-9}"`.
pub fn generate_code(prefix: &str, length: usize) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..length)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{suffix}")
}

/// Lower-case a domain restriction and drop a leading `@`. Blank means
/// no restriction.
fn normalize_domain(domain: Option<&str>) -> Option<String> {
    domain
        .map(|d| d.trim().trim_start_matches('@').to_lowercase())
        .filter(|d| !d.is_empty())
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub code: InviteCode,
    pub account: Account,
    /// `Unchanged` when the redeemer was already approved; no use was
    /// taken in that case.
    pub transition: Transition,
}

pub struct InviteService<I: InviteCodeRepository, A: AccountRepository> {
    invites: I,
    accounts: AccountService<A>,
    config: PortalConfig,
}

impl<I: InviteCodeRepository, A: AccountRepository> InviteService<I, A> {
    pub fn new(invites: I, accounts: AccountService<A>, config: PortalConfig) -> Self {
        Self {
            invites,
            accounts,
            config,
        }
    }

    /// Issue a new code on behalf of an approved member.
    pub async fn issue(
        &self,
        issued_by: &str,
        max_uses: u32,
        invitee_domain: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> PortalResult<InviteCode> {
        if max_uses < 1 {
            return Err(WorkflowError::InvalidMaxUses.into());
        }
        if expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(WorkflowError::InvalidExpiry.into());
        }
        let issuer = self.accounts.require_approved(issued_by).await?;
        let invitee_domain = normalize_domain(invitee_domain);

        for attempt in 1..=self.config.invite_code_attempts {
            let code = generate_code(
                &self.config.invite_code_prefix,
                self.config.invite_code_length,
            );
            match self
                .invites
                .create(CreateInviteCode {
                    code,
                    issued_by: issuer.id.clone(),
                    max_uses,
                    invitee_domain: invitee_domain.clone(),
                    expires_at,
                })
                .await
            {
                Ok(invite) => {
                    tracing::info!(
                        code = %invite.code,
                        issued_by = %invite.issued_by,
                        max_uses,
                        domain = ?invite.invitee_domain,
                        "invite code issued"
                    );
                    return Ok(invite);
                }
                Err(PortalError::AlreadyExists { .. }) => {
                    tracing::debug!(attempt, "invite code collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(PortalError::Conflict {
            reason: format!(
                "no unused invite code after {} attempts",
                self.config.invite_code_attempts
            ),
        })
    }

    /// Redeem `code` for the account of `principal_id`.
    pub async fn redeem(&self, code: &str, principal_id: &str) -> PortalResult<Redemption> {
        let code = code.trim();
        let invite = self.get_code(code).await?;
        let account = self.accounts.get(principal_id).await?;
        let now = Utc::now();

        if invite.is_expired(now) || (!invite.active && !invite.is_exhausted()) {
            return Err(WorkflowError::CodeExpired.into());
        }
        if invite.is_exhausted() {
            return Err(WorkflowError::CodeExhausted.into());
        }
        if !invite.accepts_domain(&account.company_domain) {
            return Err(WorkflowError::DomainMismatch.into());
        }

        if account.trust_state.is_approved() {
            return Ok(Redemption {
                code: invite,
                transition: Transition::Unchanged(account.trust_state),
                account,
            });
        }

        let consumed = with_retry(&self.config, "consume_invite_use", move || {
            self.invites.consume_use(code, now)
        })
        .await?;
        let Some(consumed) = consumed else {
            // Lost the race for the last use, or the code expired or was
            // revoked meanwhile.
            let current = self.get_code(code).await?;
            tracing::warn!(code, principal_id, "invite code changed before its use was taken");
            let retired = !current.active && !current.is_exhausted();
            return Err(if retired || current.is_expired(Utc::now()) {
                WorkflowError::CodeExpired.into()
            } else {
                WorkflowError::CodeExhausted.into()
            });
        };

        let elevated = match self.accounts.invite_redeemed(principal_id).await {
            Ok(elevated) => elevated,
            Err(e) => {
                tracing::warn!(code, principal_id, error = %e, "releasing invite use after failed elevation");
                self.give_back_use(code).await;
                return Err(e);
            }
        };

        if !elevated.transition.is_changed() {
            // Approved by someone else after the check above.
            tracing::info!(code, principal_id, "account already approved, invite use returned");
            let code = self.give_back_use(code).await.unwrap_or(consumed);
            return Ok(Redemption {
                code,
                account: elevated.account,
                transition: elevated.transition,
            });
        }

        tracing::info!(
            code,
            account_id = %elevated.account.id,
            uses = consumed.current_uses,
            max_uses = consumed.max_uses,
            "invite code redeemed"
        );
        Ok(Redemption {
            code: consumed,
            account: elevated.account,
            transition: elevated.transition,
        })
    }

    /// Revoke a code. Only its issuer may do so.
    pub async fn deactivate(&self, code: &str, caller_id: &str) -> PortalResult<InviteCode> {
        let invite = self.get_code(code.trim()).await?;
        if invite.issued_by != caller_id {
            return Err(WorkflowError::NotAuthorized.into());
        }
        let invite = self.invites.deactivate(&invite.code).await?;
        tracing::info!(code = %invite.code, "invite code deactivated");
        Ok(invite)
    }

    /// Codes issued by `issuer`, newest first.
    pub async fn list_issued(&self, issuer: &str) -> PortalResult<Vec<InviteCode>> {
        let page = self
            .invites
            .list_by_issuer(issuer, Pagination::first(self.config.search_corpus_limit))
            .await?;
        Ok(page.items)
    }

    /// Return a use taken by `redeem`. A failure is logged, not raised.
    async fn give_back_use(&self, code: &str) -> Option<InviteCode> {
        let released = with_retry(&self.config, "release_invite_use", move || {
            self.invites.release_use(code)
        })
        .await;
        match released {
            Ok(invite) => Some(invite),
            Err(e) => {
                tracing::error!(code, error = %e, "could not release invite use");
                None
            }
        }
    }

    async fn get_code(&self, code: &str) -> PortalResult<InviteCode> {
        self.invites.get_by_code(code).await.map_err(|e| match e {
            PortalError::NotFound { .. } => WorkflowError::CodeNotFound.into(),
            other => other,
        })
    }
}
