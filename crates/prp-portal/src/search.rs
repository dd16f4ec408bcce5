//! Approximate text matching over an in-memory working set.
//!
//! A field's score is the smallest edit distance between the query and any
//! substring of the field, divided by the query length. `0.0` is an exact
//! substring hit and `1.0` means nothing in common. A record scores the best
//! of its searched fields. Scores are computed per query; nothing is
//! indexed or cached.

use prp_core::models::press_release::{PressRelease, PressReleaseFields};

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Headline,
    Location,
    Date,
    What,
    Who,
    When,
    Where,
    Why,
    How,
    Website,
}

/// Fields searched on the public feed.
pub const PUBLIC_FEED_FIELDS: &[SearchField] = &[
    SearchField::Headline,
    SearchField::What,
    SearchField::Who,
    SearchField::Location,
];

/// Fields searched over an owner's own releases.
pub const OWNER_FIELDS: &[SearchField] = &[
    SearchField::Headline,
    SearchField::Location,
    SearchField::What,
    SearchField::Who,
    SearchField::When,
    SearchField::Where,
    SearchField::Why,
    SearchField::How,
];

/// A record that exposes named text fields to the matcher.
pub trait Searchable {
    fn field_text(&self, field: SearchField) -> &str;
}

impl Searchable for PressReleaseFields {
    fn field_text(&self, field: SearchField) -> &str {
        match field {
            SearchField::Headline => &self.headline,
            SearchField::Location => &self.location,
            SearchField::Date => &self.date,
            SearchField::What => &self.what,
            SearchField::Who => &self.who,
            SearchField::When => &self.when,
            SearchField::Where => &self.r#where,
            SearchField::Why => &self.why,
            SearchField::How => &self.how,
            SearchField::Website => &self.website,
        }
    }
}

impl Searchable for PressRelease {
    fn field_text(&self, field: SearchField) -> &str {
        self.fields.field_text(field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a, T> {
    pub item: &'a T,
    pub score: f64,
}

/// Rank `corpus` against `query`.
///
/// An empty query returns the whole corpus in input order with score 0.
/// Otherwise records scoring at most `threshold` are returned by ascending
/// score; ties keep corpus order.
pub fn search<'a, T: Searchable>(
    corpus: &'a [T],
    query: &str,
    fields: &[SearchField],
    threshold: f64,
) -> Result<Vec<SearchHit<'a, T>>, WorkflowError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(WorkflowError::InvalidThreshold);
    }
    if fields.is_empty() {
        return Err(WorkflowError::NoSearchFields);
    }

    let needle: Vec<char> = query.trim().to_lowercase().chars().collect();
    if needle.is_empty() {
        return Ok(corpus
            .iter()
            .map(|item| SearchHit { item, score: 0.0 })
            .collect());
    }

    let mut hits: Vec<SearchHit<'a, T>> = corpus
        .iter()
        .filter_map(|item| {
            let score = fields
                .iter()
                .map(|&field| field_score(&needle, item.field_text(field)))
                .fold(1.0_f64, f64::min);
            (score <= threshold).then_some(SearchHit { item, score })
        })
        .collect();
    // Stable sort keeps corpus order among equal scores.
    hits.sort_by(|a, b| a.score.total_cmp(&b.score));

    tracing::debug!(
        query_len = needle.len(),
        corpus = corpus.len(),
        hits = hits.len(),
        threshold,
        "fuzzy search"
    );
    Ok(hits)
}

/// Normalized approximate-substring distance of `needle` within `text`.
pub fn field_score(needle: &[char], text: &str) -> f64 {
    if needle.is_empty() {
        return 0.0;
    }
    let haystack: Vec<char> = text.to_lowercase().chars().collect();
    let distance = substring_distance(needle, &haystack);
    (distance as f64 / needle.len() as f64).min(1.0)
}

/// Minimum edit distance between `needle` and any substring of `haystack`.
///
/// Dynamic programming over needle prefixes where a match may start at any
/// haystack position at no cost.
fn substring_distance(needle: &[char], haystack: &[char]) -> usize {
    let m = needle.len();
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut cur = vec![0; m + 1];
    let mut best = prev[m];

    for &h in haystack {
        cur[0] = 0;
        for i in 1..=m {
            let substitution = prev[i - 1] + usize::from(needle[i - 1] != h);
            cur[i] = substitution.min(prev[i] + 1).min(cur[i - 1] + 1);
        }
        best = best.min(cur[m]);
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(headline: &str, location: &str) -> PressReleaseFields {
        PressReleaseFields {
            headline: headline.into(),
            location: location.into(),
            ..PressReleaseFields::default()
        }
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn exact_substring_scores_zero() {
        assert_eq!(field_score(&chars("nairob"), "Nairobi"), 0.0);
        assert_eq!(field_score(&chars("robi"), "Nairobi, Kenya"), 0.0);
    }

    #[test]
    fn one_typo_scores_by_query_length() {
        let score = field_score(&chars("nairbi"), "Nairobi");
        assert!((score - 1.0 / 6.0).abs() < 1e-9, "{score}");
    }

    #[test]
    fn unrelated_text_scores_high() {
        assert!(field_score(&chars("zzzz"), "Nairobi") >= 0.99);
        assert_eq!(field_score(&chars("abc"), ""), 1.0);
    }

    #[test]
    fn empty_query_returns_corpus_in_order() {
        let corpus = vec![release("B", "x"), release("A", "y")];
        let hits = search(&corpus, "   ", &[SearchField::Headline], 0.3).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.headline, "B");
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn results_sorted_by_score_with_stable_ties() {
        let corpus = vec![
            release("Harbour opening", "Mombasa"),
            release("Tech week", "Nairbi"),
            release("Marathon", "Nairobi"),
            release("Film festival", "Nairobi"),
        ];
        let hits = search(
            &corpus,
            "Nairobi",
            &[SearchField::Headline, SearchField::Location],
            0.3,
        )
        .unwrap();
        let headlines: Vec<&str> = hits.iter().map(|h| h.item.headline.as_str()).collect();
        assert_eq!(headlines, ["Marathon", "Film festival", "Tech week"]);
    }

    #[test]
    fn best_field_wins() {
        let corpus = vec![release("Nairobi summit", "Zanzibar")];
        let hits = search(
            &corpus,
            "nairobi",
            &[SearchField::Location, SearchField::Headline],
            0.0,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn unsearched_fields_are_ignored() {
        let corpus = vec![release("Summit", "Nairobi")];
        let hits = search(&corpus, "nairobi", &[SearchField::Headline], 0.3).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let corpus = vec![release("A", "B")];
        assert!(matches!(
            search(&corpus, "a", &[SearchField::Headline], 1.5),
            Err(WorkflowError::InvalidThreshold)
        ));
        assert!(matches!(
            search(&corpus, "a", &[], 0.3),
            Err(WorkflowError::NoSearchFields)
        ));
    }
}
