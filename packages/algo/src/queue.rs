//! Due Queue Selection
//!
//! Builds the review session for "now": overdue reinforcement first, then
//! never-reviewed words up to the remaining new-word budget.
//!
//! Ordering is total so identical inputs always give identical output:
//! - review pool: `due_at` asc, `easiness` asc, id asc
//! - new pool: `created_at` asc, id asc

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// View of a stored record needed to place it in the queue
pub trait QueueEntry {
    fn entry_id(&self) -> &str;
    fn due_at(&self) -> DateTime<Utc>;
    fn easiness(&self) -> f64;
    fn created_at(&self) -> DateTime<Utc>;
    /// True for words that have never been reviewed
    fn is_unreviewed(&self) -> bool;
}

pub fn compare_due<T: QueueEntry>(a: &T, b: &T) -> Ordering {
    a.due_at()
        .cmp(&b.due_at())
        .then_with(|| a.easiness().total_cmp(&b.easiness()))
        .then_with(|| a.entry_id().cmp(b.entry_id()))
}

pub fn compare_new<T: QueueEntry>(a: &T, b: &T) -> Ordering {
    a.created_at()
        .cmp(&b.created_at())
        .then_with(|| a.entry_id().cmp(b.entry_id()))
}

/// How many never-reviewed words may join a session.
///
/// Only slots left over by due reviews are offered, and never more than
/// what remains of the day's quota.
pub fn new_word_budget(limit: usize, due_count: usize, quota: usize, introduced_today: usize) -> usize {
    limit
        .saturating_sub(due_count)
        .min(quota.saturating_sub(introduced_today))
}

/// Pick and order the session from a candidate set.
///
/// Candidates may arrive in any order and may include entries that are not
/// due yet; those are dropped.
pub fn select_due<T: QueueEntry>(
    candidates: Vec<T>,
    now: DateTime<Utc>,
    limit: usize,
    new_budget: usize,
) -> Vec<T> {
    let (mut fresh, mut review): (Vec<T>, Vec<T>) = candidates
        .into_iter()
        .filter(|entry| entry.due_at() <= now)
        .partition(|entry| entry.is_unreviewed());

    review.sort_by(compare_due);
    review.truncate(limit);

    let slots = limit.saturating_sub(review.len()).min(new_budget);
    fresh.sort_by(compare_new);
    fresh.truncate(slots);

    review.extend(fresh);
    review
}
