//! Category hierarchy helpers and page-score aggregation.
//!
//! Categories are hyphen-separated hierarchies (`sports-tennis-doubles`).
//! Fallback walks the hierarchy towards the root one segment at a time.

use std::collections::VecDeque;

use crate::user_model::PageScore;

/// Split a category into its hierarchy segments. An empty category has no
/// segments.
pub fn split_segments(category: &str) -> Vec<String> {
    if category.is_empty() {
        return Vec::new();
    }
    category.split('-').map(str::to_string).collect()
}

/// The category one level up the hierarchy, or `None` at the root.
pub fn parent(category: &str) -> Option<&str> {
    category.rfind('-').map(|pos| &category[..pos])
}

/// Element-wise sum of every score vector in the history, newest first.
///
/// Returns `None` when the history is empty or when any entry's length
/// differs from the newest entry's, which happens when the model was
/// reloaded with a different category count mid-history.
pub fn sum_page_scores(history: &VecDeque<PageScore>) -> Option<PageScore> {
    let count = history.front()?.len();

    let mut summed = vec![0.0; count];
    for scores in history {
        if scores.len() != count {
            return None;
        }
        for (total, score) in summed.iter_mut().zip(scores) {
            *total += score;
        }
    }

    Some(summed)
}
