//! Repository trait definitions for data access abstraction.
//!
//! These are the only document-store primitives the workflows rely on:
//! keyed reads, creates, field updates, conditional updates, deletes and
//! filtered listings with a single sort key. All operations are async.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PortalResult;
use crate::models::{
    account::{Account, CreateAccount, TrustState, UpdateAccount},
    endorsement::{CreateEndorsementRequest, EndorsementRequest, EndorsementStatus},
    invite_code::{CreateInviteCode, InviteCode},
    press_release::{CreatePressRelease, PressRelease, PressReleaseFields, ReleaseStatus},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Pagination {
    /// First page holding up to `limit` items.
    pub fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the principal already has a record.
    fn create(&self, input: CreateAccount) -> impl Future<Output = PortalResult<Account>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = PortalResult<Account>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = PortalResult<Account>> + Send;
    fn update(
        &self,
        id: &str,
        input: UpdateAccount,
    ) -> impl Future<Output = PortalResult<Account>> + Send;

    /// Atomically count one accepted endorsement against the account's quota.
    ///
    /// A window whose `period_reset_at` is at or before `now` restarts at one
    /// and moves its reset to `next_reset_at`. Also adds one reputation
    /// point. Returns `None`, writing nothing, when the quota is already used
    /// up or `max_per_period` is zero.
    fn record_endorsement(
        &self,
        id: &str,
        max_per_period: u32,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> impl Future<Output = PortalResult<Option<Account>>> + Send;

    /// Undo one [`record_endorsement`](Self::record_endorsement).
    fn release_endorsement(&self, id: &str) -> impl Future<Output = PortalResult<Account>> + Send;

    /// Accounts in the given state, oldest first.
    fn list_by_trust_state(
        &self,
        state: TrustState,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<Account>>> + Send;
}

// ---------------------------------------------------------------------------
// Invite codes
// ---------------------------------------------------------------------------

pub trait InviteCodeRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the code is taken.
    fn create(
        &self,
        input: CreateInviteCode,
    ) -> impl Future<Output = PortalResult<InviteCode>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = PortalResult<InviteCode>> + Send;

    /// Atomically take one use of an active, unexpired, non-exhausted code.
    ///
    /// Returns `None` when the code did not satisfy those conditions at the
    /// moment of the update. Clears `active` once the last use is taken.
    fn consume_use(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = PortalResult<Option<InviteCode>>> + Send;

    /// Give back a use taken by [`consume_use`](Self::consume_use).
    fn release_use(&self, code: &str) -> impl Future<Output = PortalResult<InviteCode>> + Send;

    fn deactivate(&self, code: &str) -> impl Future<Output = PortalResult<InviteCode>> + Send;

    /// Codes issued by a principal, newest first.
    fn list_by_issuer(
        &self,
        issued_by: &str,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<InviteCode>>> + Send;
}

// ---------------------------------------------------------------------------
// Endorsement requests
// ---------------------------------------------------------------------------

pub trait EndorsementRepository: Send + Sync {
    /// Create a pending request.
    ///
    /// Fails with `AlreadyExists` when a pending request for the same
    /// (requester, target) pair already exists.
    fn create(
        &self,
        input: CreateEndorsementRequest,
    ) -> impl Future<Output = PortalResult<EndorsementRequest>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<EndorsementRequest>> + Send;
    fn find_pending(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> impl Future<Output = PortalResult<Option<EndorsementRequest>>> + Send;

    /// Move a pending request to `status`.
    ///
    /// Returns `None` if the request was no longer pending.
    fn resolve(
        &self,
        id: Uuid,
        status: EndorsementStatus,
    ) -> impl Future<Output = PortalResult<Option<EndorsementRequest>>> + Send;

    /// Requests addressed to a target, newest first.
    fn list_by_target(
        &self,
        target_id: &str,
        status: Option<EndorsementStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<EndorsementRequest>>> + Send;

    /// Requests sent by a requester, newest first.
    fn list_by_requester(
        &self,
        requester_id: &str,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<EndorsementRequest>>> + Send;
}

// ---------------------------------------------------------------------------
// Press releases
// ---------------------------------------------------------------------------

pub trait PressReleaseRepository: Send + Sync {
    /// Create a release in `PendingModeration`.
    fn create(
        &self,
        input: CreatePressRelease,
    ) -> impl Future<Output = PortalResult<PressRelease>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<PressRelease>> + Send;
    /// Replace the content and stamp `updated_at`. Status is untouched.
    fn update_fields(
        &self,
        id: Uuid,
        fields: PressReleaseFields,
    ) -> impl Future<Output = PortalResult<PressRelease>> + Send;
    fn set_status(
        &self,
        id: Uuid,
        status: ReleaseStatus,
    ) -> impl Future<Output = PortalResult<PressRelease>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = PortalResult<()>> + Send;
    /// Releases in a status, newest first.
    fn list_by_status(
        &self,
        status: ReleaseStatus,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<PressRelease>>> + Send;
    /// Releases of one owner in any status, newest first.
    fn list_by_owner(
        &self,
        owner_id: &str,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<PressRelease>>> + Send;
}
