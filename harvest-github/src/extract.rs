//! Record extraction: admission filters and derived fields
//!
//! A pull request becomes a [`DerivedRecord`] only if it has at least one
//! review, was merged or closed, and stayed open for at least an hour.
//! Anything else yields `None`; filtering is not an error.

use harvest_core::{DerivedRecord, ReviewState};

use crate::nodes::{PullRequestFacts, PullRequestNode, ReviewEntry};

/// Pull requests resolved faster than this are bot-speed noise
pub const MIN_OPEN_SECONDS: i64 = 3600;

/// Turn one pull request node into a record, or filter it out
pub fn extract(node: PullRequestNode) -> Option<DerivedRecord> {
    extract_facts(PullRequestFacts::from(node))
}

fn extract_facts(pr: PullRequestFacts) -> Option<DerivedRecord> {
    if pr.reviews_count < 1 {
        return None;
    }

    let closed_or_merged_at = pr.merged_at.or(pr.closed_at)?;

    let open_seconds = (closed_or_merged_at - pr.created_at).num_seconds();
    if open_seconds < MIN_OPEN_SECONDS {
        return None;
    }
    let hours_open = (open_seconds as f64 / 3600.0 * 100.0).round() / 100.0;

    let final_review_state = final_review_state(&pr.reviews, pr.merged);

    Some(DerivedRecord {
        number: pr.number,
        title: pr.title,
        author: pr.author,
        created_at: pr.created_at,
        closed_or_merged_at,
        reviews_count: pr.reviews_count,
        hours_open,
        merged: pr.merged,
        additions: pr.additions,
        deletions: pr.deletions,
        changed_files: pr.changed_files,
        body_length: pr.body_length,
        issue_comments_count: pr.issue_comments,
        review_threads_count: pr.review_threads,
        interactions_count: pr.issue_comments + pr.review_threads,
        final_review_state,
    })
}

/// State of the chronologically last review
///
/// Reviews without any timestamp are ignored. On an exact timestamp tie the
/// later entry in input order wins. With no usable review the state falls
/// back to `MERGED` or `CLOSED`.
pub fn final_review_state(reviews: &[ReviewEntry], merged: bool) -> ReviewState {
    let latest = reviews
        .iter()
        .filter_map(|review| review.timestamp.map(|at| (at, review)))
        // max_by_key keeps the last of equal maxima
        .max_by_key(|(at, _)| *at);

    match latest {
        Some((_, review)) => review
            .state
            .as_deref()
            .map(ReviewState::from_api)
            .unwrap_or(ReviewState::None),
        None => ReviewState::fallback(merged),
    }
}
