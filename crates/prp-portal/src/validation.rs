//! Press release field validation and plain-text preview.
//!
//! Submit, edit and preview share [`validate_fields`]; only the
//! `allow_partial` flag differs.

use prp_core::models::press_release::PressReleaseFields;

use crate::error::WorkflowError;

pub const DEFAULT_MAX_WORDS: usize = 1000;

/// Whitespace-delimited tokens across the six narrative fields.
pub fn word_count(fields: &PressReleaseFields) -> usize {
    fields
        .narrative()
        .iter()
        .map(|(_, text)| text.split_whitespace().count())
        .sum()
}

/// Validate with the default word limit.
pub fn validate_fields(
    fields: &PressReleaseFields,
    allow_partial: bool,
) -> Result<(), WorkflowError> {
    validate_fields_with_limit(fields, allow_partial, DEFAULT_MAX_WORDS)
}

/// Check completeness (unless `allow_partial`) and the word limit.
///
/// The first empty field is reported in form order: headline, location,
/// date, what, who, when, where, why, how, website.
pub fn validate_fields_with_limit(
    fields: &PressReleaseFields,
    allow_partial: bool,
    max_words: usize,
) -> Result<(), WorkflowError> {
    if !allow_partial {
        let missing = fields
            .required()
            .into_iter()
            .find(|(_, text)| text.trim().is_empty());
        if let Some((field, _)) = missing {
            return Err(WorkflowError::IncompleteSubmission { field });
        }
    }

    let count = word_count(fields);
    if count > max_words {
        return Err(WorkflowError::WordLimitExceeded { count });
    }
    Ok(())
}

/// Render the live preview shown while a release is being written.
///
/// Missing headline, location and date show placeholders; empty
/// narrative fields and an empty website are left out.
pub fn preview(fields: &PressReleaseFields) -> Result<String, WorkflowError> {
    preview_with_limit(fields, DEFAULT_MAX_WORDS)
}

pub fn preview_with_limit(
    fields: &PressReleaseFields,
    max_words: usize,
) -> Result<String, WorkflowError> {
    validate_fields_with_limit(fields, true, max_words)?;

    let or = |text: &str, placeholder: &'static str| -> String {
        let text = text.trim();
        if text.is_empty() {
            placeholder.to_string()
        } else {
            text.to_string()
        }
    };

    let mut blocks = vec![
        format!("**{}**", or(&fields.headline, "[Headline]")),
        format!(
            "{} : {}",
            or(&fields.location, "[Location]"),
            or(&fields.date, "[Date]")
        ),
    ];
    for (name, text) in fields.narrative() {
        let text = text.trim();
        if !text.is_empty() {
            blocks.push(format!("**{}:** {text}", capitalize(name)));
        }
    }
    let website = fields.website.trim();
    if !website.is_empty() {
        blocks.push(format!("Visit: {website}"));
    }
    Ok(blocks.join("\n\n"))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
