//! Press release domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReleaseStatus {
    PendingModeration,
    Approved,
    Rejected,
}

/// The author-supplied content of a press release.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PressReleaseFields {
    pub headline: String,
    pub location: String,
    pub date: String,
    pub what: String,
    pub who: String,
    pub when: String,
    pub r#where: String,
    pub why: String,
    pub how: String,
    pub website: String,
}

impl PressReleaseFields {
    /// The six narrative fields, in display order.
    pub fn narrative(&self) -> [(&'static str, &str); 6] {
        [
            ("what", &self.what),
            ("who", &self.who),
            ("when", &self.when),
            ("where", &self.r#where),
            ("why", &self.why),
            ("how", &self.how),
        ]
    }

    /// Every required field, in the order a form presents them.
    pub fn required(&self) -> [(&'static str, &str); 10] {
        [
            ("headline", &self.headline),
            ("location", &self.location),
            ("date", &self.date),
            ("what", &self.what),
            ("who", &self.who),
            ("when", &self.when),
            ("where", &self.r#where),
            ("why", &self.why),
            ("how", &self.how),
            ("website", &self.website),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressRelease {
    pub id: Uuid,
    pub owner_id: String,
    pub owner_email: String,
    pub status: ReleaseStatus,
    pub fields: PressReleaseFields,
    pub created_at: DateTime<Utc>,
    /// Set on every owner edit.
    pub updated_at: Option<DateTime<Utc>>,
}

impl PressRelease {
    pub fn is_public(&self) -> bool {
        self.status == ReleaseStatus::Approved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePressRelease {
    pub owner_id: String,
    pub owner_email: String,
    pub fields: PressReleaseFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_field_serializes_without_raw_prefix() {
        let fields = PressReleaseFields {
            r#where: "Main hall".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["where"], "Main hall");
    }

    #[test]
    fn narrative_excludes_headline_and_website() {
        let names: Vec<_> = PressReleaseFields::default()
            .narrative()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(names, ["what", "who", "when", "where", "why", "how"]);
    }
}
