//! Workflow configuration with TOML support.

use std::path::Path;

use prp_core::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};

/// Tunables for the portal workflows.
///
/// Every field has a default, so an empty `[portal]` table (or none at all)
/// yields [`PortalConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Word limit over the six narrative fields of a press release.
    pub max_words: usize,
    /// Fuzzy match threshold in `[0, 1]`; lower is stricter.
    pub search_threshold: f64,
    /// Upper bound on records loaded into one search.
    pub search_corpus_limit: u64,
    pub invite_code_prefix: String,
    /// Number of random characters after the prefix.
    pub invite_code_length: usize,
    /// Inserts attempted with fresh codes before giving up on collisions.
    pub invite_code_attempts: u32,
    pub max_endorsements_per_period: u32,
    pub endorsement_period_days: i64,
    /// Attempts for conditional store updates that hit a transient error.
    pub store_retry_attempts: u32,
    /// Linear backoff step between retries, in milliseconds.
    pub store_retry_backoff_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            max_words: 1000,
            search_threshold: 0.3,
            search_corpus_limit: 1000,
            invite_code_prefix: "PRP".into(),
            invite_code_length: 6,
            invite_code_attempts: 5,
            max_endorsements_per_period: 5,
            endorsement_period_days: 30,
            store_retry_attempts: 3,
            store_retry_backoff_ms: 50,
        }
    }
}

impl PortalConfig {
    pub fn from_toml_str(s: &str) -> PortalResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| PortalError::Validation {
            message: format!("invalid portal config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> PortalResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PortalError::Internal(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the workflows cannot operate with.
    pub fn validate(&self) -> PortalResult<()> {
        let invalid = |message: &str| {
            Err(PortalError::Validation {
                message: message.into(),
            })
        };
        if !(0.0..=1.0).contains(&self.search_threshold) {
            return invalid("search_threshold must be within [0, 1]");
        }
        if self.invite_code_length == 0 {
            return invalid("invite_code_length must be at least 1");
        }
        if self.invite_code_attempts == 0 || self.store_retry_attempts == 0 {
            return invalid("retry attempt counts must be at least 1");
        }
        if self.endorsement_period_days <= 0 {
            return invalid("endorsement_period_days must be positive");
        }
        Ok(())
    }
}
