//! PRP Portal — account trust, invite codes, endorsements, moderation
//! and fuzzy search over the press release corpus.

pub mod account;
pub mod config;
pub mod endorsement;
pub mod error;
pub mod invite;
pub mod press_release;
mod retry;
pub mod search;
pub mod validation;

pub use account::{AccountService, Transition, TrustEvent};
pub use config::PortalConfig;
pub use endorsement::{Decision, EndorsementService, EndorsementTarget};
pub use error::WorkflowError;
pub use invite::{InviteService, Redemption};
pub use press_release::{ModerationDecision, PressReleaseService};
pub use search::{SearchField, SearchHit, Searchable, search};
pub use validation::{preview, validate_fields};
