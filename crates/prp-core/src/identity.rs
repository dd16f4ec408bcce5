//! Identity-provider boundary.
//!
//! Credential verification happens outside the portal. The workflows only
//! consume the authenticated principal and the outcome of sign-in, sign-up
//! and sign-out calls.

use serde::{Deserialize, Serialize};

use crate::error::PortalResult;

/// An authenticated caller as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

/// Operations consumed from the identity provider.
///
/// Failures are reported as `PortalError::AuthenticationFailed` carrying
/// the provider's message verbatim.
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in principal, if any.
    fn current_principal(&self) -> impl Future<Output = Option<Principal>> + Send;
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = PortalResult<Principal>> + Send;
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = PortalResult<Principal>> + Send;
    fn sign_out(&self) -> impl Future<Output = PortalResult<()>> + Send;
}
