//! Press release submission and moderation.
//!
//! Only approved accounts submit. Every submission starts in
//! `PendingModeration`; a moderator decides whether it becomes public.
//! Owners always see their own releases, everyone else sees approved ones.

use prp_core::error::{PortalError, PortalResult};
use prp_core::models::press_release::{
    CreatePressRelease, PressRelease, PressReleaseFields, ReleaseStatus,
};
use prp_core::repository::{AccountRepository, Pagination, PaginatedResult, PressReleaseRepository};
use uuid::Uuid;

use crate::account::AccountService;
use crate::config::PortalConfig;
use crate::error::WorkflowError;
use crate::search::{OWNER_FIELDS, PUBLIC_FEED_FIELDS, SearchField, search};
use crate::validation::{preview_with_limit, validate_fields_with_limit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    Approve,
    Reject,
}

impl ModerationDecision {
    fn status(self) -> ReleaseStatus {
        match self {
            ModerationDecision::Approve => ReleaseStatus::Approved,
            ModerationDecision::Reject => ReleaseStatus::Rejected,
        }
    }
}

pub struct PressReleaseService<P: PressReleaseRepository, A: AccountRepository> {
    releases: P,
    accounts: AccountService<A>,
    config: PortalConfig,
}

impl<P: PressReleaseRepository, A: AccountRepository> PressReleaseService<P, A> {
    pub fn new(releases: P, accounts: AccountService<A>, config: PortalConfig) -> Self {
        Self {
            releases,
            accounts,
            config,
        }
    }

    pub async fn submit(
        &self,
        owner_id: &str,
        fields: PressReleaseFields,
    ) -> PortalResult<PressRelease> {
        let owner = self
            .accounts
            .require_approved(owner_id)
            .await
            .map_err(|e| match e {
                PortalError::AuthorizationDenied { .. } => WorkflowError::NotAuthorized.into(),
                other => other,
            })?;
        self.validate(&fields)?;

        let release = self
            .releases
            .create(CreatePressRelease {
                owner_id: owner.id,
                owner_email: owner.email,
                fields,
            })
            .await?;
        tracing::info!(
            release_id = %release.id,
            owner_id = %release.owner_id,
            "press release submitted for moderation"
        );
        Ok(release)
    }

    /// Replace the content of an owned release. The moderation status is
    /// kept as it is.
    pub async fn edit(
        &self,
        release_id: Uuid,
        editor_id: &str,
        fields: PressReleaseFields,
    ) -> PortalResult<PressRelease> {
        let release = self.releases.get_by_id(release_id).await?;
        if release.owner_id != editor_id {
            return Err(WorkflowError::NotAuthorized.into());
        }
        self.validate(&fields)?;

        let release = self.releases.update_fields(release_id, fields).await?;
        tracing::info!(release_id = %release.id, "press release edited");
        Ok(release)
    }

    pub async fn delete(&self, release_id: Uuid, caller_id: &str) -> PortalResult<()> {
        let release = self.releases.get_by_id(release_id).await?;
        if release.owner_id != caller_id {
            return Err(WorkflowError::NotAuthorized.into());
        }
        self.releases.delete(release_id).await?;
        tracing::info!(%release_id, owner_id = %release.owner_id, "press release deleted");
        Ok(())
    }

    /// Moderator decision. Repeating a decision is a no-op; a different
    /// decision overwrites the previous one.
    pub async fn moderate(
        &self,
        release_id: Uuid,
        decision: ModerationDecision,
    ) -> PortalResult<PressRelease> {
        let release = self.releases.get_by_id(release_id).await?;
        let status = decision.status();
        if release.status == status {
            return Ok(release);
        }

        let release = self.releases.set_status(release_id, status).await?;
        tracing::info!(
            release_id = %release.id,
            ?decision,
            "press release moderated"
        );
        Ok(release)
    }

    /// Releases awaiting a moderator, newest first.
    pub async fn moderation_queue(
        &self,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<PressRelease>> {
        self.releases
            .list_by_status(ReleaseStatus::PendingModeration, pagination)
            .await
    }

    /// Approved releases matching `query`, best match first.
    pub async fn public_feed(&self, query: &str) -> PortalResult<Vec<PressRelease>> {
        let page = self
            .releases
            .list_by_status(ReleaseStatus::Approved, self.corpus_page())
            .await?;
        self.filter(&page.items, query, PUBLIC_FEED_FIELDS)
    }

    /// Every release of `owner_id` in any status, matching `query`.
    pub async fn owner_releases(
        &self,
        owner_id: &str,
        query: &str,
    ) -> PortalResult<Vec<PressRelease>> {
        let page = self
            .releases
            .list_by_owner(owner_id, self.corpus_page())
            .await?;
        self.filter(&page.items, query, OWNER_FIELDS)
    }

    /// A single release. Non-public releases are only disclosed to their
    /// owner; anyone else gets `NotFound`.
    pub async fn view(&self, release_id: Uuid, viewer_id: Option<&str>) -> PortalResult<PressRelease> {
        let release = self.releases.get_by_id(release_id).await?;
        if release.is_public() || viewer_id == Some(release.owner_id.as_str()) {
            Ok(release)
        } else {
            Err(PortalError::not_found("press_release", release_id.to_string()))
        }
    }

    pub fn preview(&self, fields: &PressReleaseFields) -> PortalResult<String> {
        Ok(preview_with_limit(fields, self.config.max_words)?)
    }

    fn validate(&self, fields: &PressReleaseFields) -> PortalResult<()> {
        Ok(validate_fields_with_limit(fields, false, self.config.max_words)?)
    }

    fn corpus_page(&self) -> Pagination {
        Pagination::first(self.config.search_corpus_limit)
    }

    fn filter(
        &self,
        corpus: &[PressRelease],
        query: &str,
        fields: &[SearchField],
    ) -> PortalResult<Vec<PressRelease>> {
        let hits = search(corpus, query, fields, self.config.search_threshold)?;
        Ok(hits.into_iter().map(|hit| hit.item.clone()).collect())
    }
}
