//! SurrealDB repository implementations.

mod account;
mod endorsement;
mod invite_code;
mod press_release;

pub use account::SurrealAccountRepository;
pub use endorsement::SurrealEndorsementRepository;
pub use invite_code::SurrealInviteCodeRepository;
pub use press_release::SurrealPressReleaseRepository;

use surrealdb_types::SurrealValue;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}
